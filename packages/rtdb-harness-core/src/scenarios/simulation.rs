//! Large-volume simulation: bulk-load date-stamped transactions, range-query
//! a window of days, bulk-delete a sample and confirm the sample is gone.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;

use crate::batch::Batch;
use crate::error::HarnessResult;
use crate::generator::{self, day_start_millis, GeneratorConfig};
use crate::harness::{expect_absent, expect_cardinality, expect_keys, Scenario};
use crate::query::{RangeQuery, RangeQueryClient};
use crate::store::{RealtimeStore, Snapshot};
use crate::writer::{BatchWriter, DEFAULT_MAX_IN_FLIGHT};

/// Timeout applied to the simulation suite.
pub const SIMULATION_TIMEOUT: Duration = Duration::from_secs(480);

/// Simulation parameters.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub generator: GeneratorConfig,
    /// Timestamp field the window query orders by
    pub order_by: String,
    /// Window length in days starting at the base date
    pub window_days: u64,
    /// Concurrent chunk updates during setup
    pub max_in_flight: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            order_by: "published".to_string(),
            window_days: 30,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// State owned by one simulation run.
#[derive(Debug, Default)]
pub struct SimulationContext {
    /// Keys reserved for the bulk delete
    pub sampled_keys: Vec<String>,
    /// Batch nulling every sampled key
    pub deletes: Batch,
    /// Generated keys whose timestamp falls inside the window
    pub expected_window: HashSet<String>,
    /// Records written during setup
    pub written: usize,
    /// Records found by a full read after setup
    pub stored: usize,
    pub first_query: Snapshot,
    pub second_query: Snapshot,
}

#[derive(Debug, Clone, Default)]
pub struct SimulationScenario {
    pub config: SimulationConfig,
}

impl SimulationScenario {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// `[start of base day, start of base day + window_days]`.
    pub fn window_query(&self) -> HarnessResult<RangeQuery> {
        let base = self.config.generator.base_date;
        Ok(RangeQuery::new(
            self.config.generator.collection.clone(),
            &self.config.order_by,
            day_start_millis(base, 0)?,
            day_start_millis(base, self.config.window_days)?,
        ))
    }
}

#[async_trait]
impl Scenario for SimulationScenario {
    type Context = SimulationContext;

    fn name(&self) -> &str {
        "app-simulation"
    }

    fn context(&self) -> SimulationContext {
        SimulationContext::default()
    }

    async fn setup(
        &self,
        store: &dyn RealtimeStore,
        ctx: &mut SimulationContext,
    ) -> HarnessResult<()> {
        let chunk_set = generator::generate(&self.config.generator)?;
        let summary = BatchWriter::new(store)
            .with_max_in_flight(self.config.max_in_flight)
            .write_all(&chunk_set.chunks)
            .await?;
        tracing::info!("Successfully updated database with chunks");

        ctx.written = summary.upserts;
        ctx.expected_window = chunk_set.keys_matching(&self.window_query()?);
        ctx.deletes = chunk_set.sampled_delete_batch(&self.config.generator.collection)?;
        ctx.sampled_keys = chunk_set.sampled_keys;
        Ok(())
    }

    async fn exercise(
        &self,
        store: &dyn RealtimeStore,
        ctx: &mut SimulationContext,
    ) -> HarnessResult<()> {
        let collection = &self.config.generator.collection;
        ctx.stored = store.read(collection).await?.len();

        let query = self.window_query()?;
        let client = RangeQueryClient::new(store);
        ctx.first_query = client.run(&query).await?;

        BatchWriter::new(store).write(&ctx.deletes).await?;
        tracing::info!("Set {} keys to null", ctx.deletes.len());

        ctx.second_query = client.run(&query).await?;
        Ok(())
    }

    async fn assert(
        &self,
        _store: &dyn RealtimeStore,
        ctx: &mut SimulationContext,
    ) -> HarnessResult<()> {
        expect_cardinality("full read after chunk writes", ctx.written, ctx.stored)?;
        expect_keys("window query", &ctx.expected_window, &ctx.first_query)?;
        expect_absent(
            "sampled keys after bulk delete",
            &ctx.sampled_keys,
            &ctx.second_query,
        )?;

        let sampled: HashSet<&String> = ctx.sampled_keys.iter().collect();
        let survivors = ctx
            .expected_window
            .iter()
            .filter(|key| !sampled.contains(key));
        expect_keys("window query after bulk delete", survivors, &ctx.second_query)
    }

    async fn teardown(
        &self,
        store: &dyn RealtimeStore,
        ctx: &mut SimulationContext,
    ) -> HarnessResult<()> {
        ctx.sampled_keys.clear();
        ctx.deletes = Batch::new();
        store.remove(&self.config.generator.collection).await?;
        tracing::info!("Removed test transactions");
        Ok(())
    }
}
