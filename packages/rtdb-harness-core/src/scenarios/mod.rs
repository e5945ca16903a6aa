//! Built-in scenario suites.

pub mod bulk;
pub mod simulation;

use std::time::Duration;

use crate::harness::Suite;

pub use bulk::{
    BulkDeleteScenario, BulkFixture, BulkWriteScenario, IdempotentWriteScenario,
    RangeQueryScenario,
};
pub use simulation::{SimulationConfig, SimulationScenario, SIMULATION_TIMEOUT};

/// Bulk write, range query, bulk delete and idempotent write over `fixture`.
/// Runs under the harness default timeout.
pub fn bulk_suite(fixture: BulkFixture) -> Suite {
    Suite::new("bulk")
        .with_scenario(BulkWriteScenario {
            fixture: fixture.clone(),
        })
        .with_scenario(RangeQueryScenario {
            fixture: fixture.clone(),
            ..RangeQueryScenario::default()
        })
        .with_scenario(BulkDeleteScenario {
            fixture: fixture.clone(),
            ..BulkDeleteScenario::default()
        })
        .with_scenario(IdempotentWriteScenario { fixture })
}

/// The transaction simulation under its own timeout.
pub fn simulation_suite(config: SimulationConfig, timeout: Duration) -> Suite {
    Suite::new("simulation")
        .with_timeout(timeout)
        .with_scenario(SimulationScenario::new(config))
}
