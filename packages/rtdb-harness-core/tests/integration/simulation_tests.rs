//! Transaction simulation at reduced volume.

use std::sync::Arc;
use std::time::Duration;

use rtdb_harness_core::generator::{ChunkDateMode, GeneratorConfig};
use rtdb_harness_core::harness::{Harness, Scenario, DEFAULT_SCENARIO_TIMEOUT};
use rtdb_harness_core::scenarios::{simulation_suite, SimulationConfig, SimulationScenario};
use rtdb_harness_core::RealtimeStore;

use super::helpers::{indexed_store, key};

fn small_config(date_mode: ChunkDateMode) -> SimulationConfig {
    SimulationConfig {
        generator: GeneratorConfig {
            record_count: 2_050,
            chunk_size: 100,
            sample_stride: 50,
            date_mode,
            ..GeneratorConfig::default()
        },
        window_days: 5,
        max_in_flight: 4,
        ..SimulationConfig::default()
    }
}

#[tokio::test]
async fn test_simulation_per_chunk_dates() {
    let store = indexed_store();
    let scenario = SimulationScenario::new(small_config(ChunkDateMode::PerChunk));
    let mut ctx = scenario.context();

    scenario.setup(&store, &mut ctx).await.unwrap();
    // 21 chunks, the last one partial.
    assert_eq!(store.updates_applied(), 21);
    assert_eq!(ctx.written, 2_050);
    assert_eq!(ctx.sampled_keys.len(), 41);
    // Chunks stamped on days 0..=4 fall inside the window.
    assert_eq!(ctx.expected_window.len(), 500);

    scenario.exercise(&store, &mut ctx).await.unwrap();
    assert_eq!(ctx.stored, 2_050);
    assert_eq!(ctx.first_query.len(), 500);
    assert_eq!(ctx.second_query.len(), 490);
    for sampled in &ctx.sampled_keys {
        assert!(!ctx.second_query.contains_key(sampled));
    }

    scenario.assert(&store, &mut ctx).await.unwrap();
    scenario.teardown(&store, &mut ctx).await.unwrap();
    assert!(store.read(&key("transactions")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_simulation_shared_chunk_date() {
    let store = indexed_store();
    let scenario = SimulationScenario::new(small_config(ChunkDateMode::Shared));
    let mut ctx = scenario.context();

    scenario.setup(&store, &mut ctx).await.unwrap();
    assert_eq!(ctx.expected_window.len(), 2_050);

    scenario.exercise(&store, &mut ctx).await.unwrap();
    assert_eq!(ctx.first_query.len(), 2_050);
    assert_eq!(ctx.second_query.len(), 2_050 - 41);

    scenario.assert(&store, &mut ctx).await.unwrap();
    scenario.teardown(&store, &mut ctx).await.unwrap();
}

#[tokio::test]
async fn test_simulation_suite_runs_under_raised_timeout() {
    let store = indexed_store();
    let harness = Harness::new(Arc::new(store.clone()));
    let suite = simulation_suite(
        small_config(ChunkDateMode::PerChunk),
        Duration::from_secs(480),
    );

    let report = harness.run_suite(&suite).await;

    assert!(report.passed(), "{:?}", report);
    assert_eq!(report.timeout, Duration::from_secs(480));
    assert_eq!(harness.default_timeout(), DEFAULT_SCENARIO_TIMEOUT);
    assert_eq!(store.record_count(), 0);
}
