//! Integration test suite.
//!
//! 1. Bulk write, range query and bulk delete scenarios
//! 2. Transaction simulation at reduced volume
//! 3. Harness lifecycle: teardown, timeouts, fatal aborts

pub mod bulk_scenarios;
pub mod harness_lifecycle;
pub mod helpers;
pub mod simulation_tests;
