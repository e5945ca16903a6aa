//! Command-line runner for the realtime database harness.
//!
//! Runs the bulk and simulation suites against an in-memory store or a
//! remote database over REST, or serves the REST API locally:
//! - `bulk`: bulk write, range query, bulk delete, idempotent write
//! - `simulate`: chunked transaction load, window query, sampled delete
//! - `serve`: local `.json` endpoint backed by memory
//! - `all`: bulk then simulate
//!
//! Exits with status 1 when any scenario fails.

mod cli;
mod report;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use rtdb_harness_api::{RestStore, Router, Server};
use rtdb_harness_core::credentials::ServiceCredential;
use rtdb_harness_core::scenarios::{bulk_suite, simulation_suite};
use rtdb_harness_core::{Harness, HarnessConfig, MemoryStore, RealtimeStore, Suite};

use cli::{Cli, Commands, StoreKind};

/// Memory store with the indexes the configured suites query on.
fn memory_store(config: &HarnessConfig) -> anyhow::Result<MemoryStore> {
    let fixture = config.bulk_fixture()?;
    let simulation = config.simulation_config()?;
    Ok(MemoryStore::new()
        .with_index(fixture.collection, "id")
        .with_index(simulation.generator.collection, &simulation.order_by))
}

fn build_store(kind: StoreKind, config: &HarnessConfig) -> anyhow::Result<Arc<dyn RealtimeStore>> {
    match kind {
        StoreKind::Memory => Ok(Arc::new(memory_store(config)?)),
        StoreKind::Rest => {
            let credential = config
                .credentials_path
                .as_ref()
                .map(ServiceCredential::from_file)
                .transpose()?;
            let url = match (&config.database_url, &credential) {
                (Some(url), _) => url.clone(),
                (None, Some(credential)) => credential
                    .default_database_url()
                    .context("credential file has no project_id and no database URL is set")?,
                (None, None) => bail!("--store rest needs --url, RTDB_DATABASE_URL or a credential file"),
            };
            let mut store = RestStore::with_timeout(&url, config.request_timeout())?;
            if let Some(credential) = &credential {
                store = store.with_credential(credential);
            }
            tracing::info!(url = %store.base_url(), "Using REST store");
            Ok(Arc::new(store))
        }
    }
}

fn build_suites(command: &Commands, config: &HarnessConfig) -> anyhow::Result<Vec<Suite>> {
    let bulk = || -> anyhow::Result<Suite> { Ok(bulk_suite(config.bulk_fixture()?)) };
    let simulation = || -> anyhow::Result<Suite> {
        Ok(simulation_suite(
            config.simulation_config()?,
            config.simulation_timeout(),
        ))
    };
    match command {
        Commands::Bulk { .. } => Ok(vec![bulk()?]),
        Commands::Simulate { .. } => Ok(vec![simulation()?]),
        Commands::All => Ok(vec![bulk()?, simulation()?]),
        Commands::Serve { .. } => Ok(Vec::new()),
    }
}

async fn serve(
    config: &HarnessConfig,
    host: &str,
    port: u16,
    secret: Option<&str>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", host, port))?;

    let mut router =
        Router::new(memory_store(config)?).with_request_timeout_ms(config.request_timeout_ms);
    if let Some(secret) = secret {
        router = router.with_secret(secret);
    }
    let server = Server::bind(addr, router).await?;
    println!("Serving on {}", server.base_url()?);

    tokio::select! {
        result = server.serve() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    let mut config = match &cli.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };
    config.apply_env_overrides()?;
    cli.apply_to(&mut config);

    if let Commands::Serve { host, port, secret } = &cli.command {
        return serve(&config, host, *port, secret.as_deref()).await;
    }

    let suites = build_suites(&cli.command, &config)?;
    let store = build_store(cli.store, &config)?;
    let harness = Harness::new(store).with_default_timeout(config.default_timeout());

    let reports = harness.run_all(&suites).await;
    print!("{}", report::format_summary(&reports));

    if !report::all_passed(&reports) {
        std::process::exit(1);
    }
    Ok(())
}
