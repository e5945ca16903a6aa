use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rtdb_harness_core::generator::ChunkDateMode;
use rtdb_harness_core::HarnessConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store backend to run against
    #[arg(long, value_enum, default_value_t = StoreKind::Memory, global = true)]
    pub store: StoreKind,

    /// Database base URL for the REST store
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Service credential JSON file
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// In-process store with the suite indexes declared
    Memory,
    /// Remote database over its REST API
    Rest,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run bulk write, range query and bulk delete scenarios
    Bulk {
        /// Number of numbered records to write
        #[arg(long)]
        records: Option<i64>,
    },

    /// Run the transaction simulation
    Simulate {
        /// Total records to generate
        #[arg(long)]
        records: Option<usize>,

        /// Records per chunk update
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Every n-th record is deleted and checked
        #[arg(long)]
        sample_stride: Option<usize>,

        /// Days covered by the range query
        #[arg(long)]
        window_days: Option<u64>,

        /// Stamp every chunk with the base date
        #[arg(long)]
        shared_chunk_date: bool,

        /// Concurrent chunk updates
        #[arg(long)]
        max_in_flight: Option<usize>,

        /// Suite timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Serve the REST API from an in-memory store
    Serve {
        /// Host address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 9000)]
        port: u16,

        /// Require `auth=<secret>` on every request
        #[arg(long)]
        secret: Option<String>,
    },

    /// Run the bulk suite then the simulation
    All,
}

impl Cli {
    /// Applies command-line flags on top of file and environment settings.
    pub fn apply_to(&self, config: &mut HarnessConfig) {
        if let Some(url) = &self.url {
            config.database_url = Some(url.clone());
        }
        if let Some(path) = &self.credentials {
            config.credentials_path = Some(path.clone());
        }

        match &self.command {
            Commands::Bulk { records } => {
                if let Some(records) = records {
                    config.bulk_records = *records;
                }
            }
            Commands::Simulate {
                records,
                chunk_size,
                sample_stride,
                window_days,
                shared_chunk_date,
                max_in_flight,
                timeout_secs,
            } => {
                if let Some(v) = records {
                    config.record_count = *v;
                }
                if let Some(v) = chunk_size {
                    config.chunk_size = *v;
                }
                if let Some(v) = sample_stride {
                    config.sample_stride = *v;
                }
                if let Some(v) = window_days {
                    config.window_days = *v;
                }
                if *shared_chunk_date {
                    config.date_mode = ChunkDateMode::Shared;
                }
                if let Some(v) = max_in_flight {
                    config.max_in_flight = *v;
                }
                if let Some(v) = timeout_secs {
                    config.simulation_timeout_ms = v.saturating_mul(1000);
                }
            }
            Commands::Serve { .. } | Commands::All => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulate_flags_override_config() {
        let cli = Cli::try_parse_from([
            "rtdb-sim",
            "--store",
            "rest",
            "--url",
            "http://127.0.0.1:9000",
            "simulate",
            "--records",
            "5000",
            "--chunk-size",
            "250",
            "--shared-chunk-date",
            "--timeout-secs",
            "60",
        ])
        .unwrap();
        assert_eq!(cli.store, StoreKind::Rest);

        let mut config = HarnessConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config.database_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(config.record_count, 5000);
        assert_eq!(config.chunk_size, 250);
        assert_eq!(config.sample_stride, 50);
        assert_eq!(config.date_mode, ChunkDateMode::Shared);
        assert_eq!(config.simulation_timeout_ms, 60_000);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["rtdb-sim", "bulk", "--records", "20", "--store", "memory"])
            .unwrap();
        let mut config = HarnessConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(cli.store, StoreKind::Memory);
        assert_eq!(config.bulk_records, 20);
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["rtdb-sim", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { host, port, secret } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 9000);
                assert!(secret.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
