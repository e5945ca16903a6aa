//! Teardown guarantees, timeout overrides and fatal-error aborts.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rtdb_harness_core::error::{HarnessError, StoreError};
use rtdb_harness_core::harness::{Harness, Outcome, Phase, Suite, DEFAULT_SCENARIO_TIMEOUT};
use rtdb_harness_core::scenarios::{bulk_suite, simulation_suite, BulkFixture, SimulationConfig};
use rtdb_harness_core::RealtimeStore;

use super::helpers::{indexed_store, key, FailingStore, Fault, StubScenario};

#[tokio::test]
async fn test_bulk_suite_passes_and_cleans_up() {
    let store = indexed_store();
    let harness = Harness::new(Arc::new(store.clone()));

    let report = harness.run_suite(&bulk_suite(BulkFixture::default())).await;

    assert!(report.passed(), "{:?}", report);
    assert_eq!(report.scenarios.len(), 4);
    assert_eq!(report.timeout, DEFAULT_SCENARIO_TIMEOUT);
    assert_eq!(store.record_count(), 0);
}

#[tokio::test]
async fn test_teardown_runs_after_assertion_failure() {
    let harness = Harness::new(Arc::new(indexed_store()));
    let stub = StubScenario::new("stub", Fault::FailAssert);

    let report = harness.run_scenario(&stub, Duration::from_secs(1)).await;

    assert!(stub.torn_down());
    match &report.outcome {
        Outcome::Failed { phase, error } => {
            assert_eq!(*phase, Phase::Assert);
            assert!(matches!(error, HarnessError::Assertion(_)));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(report.teardown_error.is_none());
}

#[tokio::test]
async fn test_teardown_failure_does_not_mask_earlier_failure() {
    let store = FailingStore::new(indexed_store())
        .failing_removes(StoreError::WriteRejected {
            path: "stub".to_string(),
            reason: "locked".to_string(),
        });
    let harness = Harness::new(Arc::new(store));
    let stub = StubScenario::new("stub", Fault::FailAssert);

    let report = harness.run_scenario(&stub, Duration::from_secs(1)).await;

    assert!(matches!(
        report.outcome,
        Outcome::Failed {
            phase: Phase::Assert,
            error: HarnessError::Assertion(_)
        }
    ));
    assert!(matches!(
        report.teardown_error,
        Some(HarnessError::Store(StoreError::WriteRejected { .. }))
    ));
}

#[tokio::test]
async fn test_teardown_failure_fails_passing_scenario() {
    let store = FailingStore::new(indexed_store())
        .failing_removes(StoreError::WriteRejected {
            path: "stub".to_string(),
            reason: "locked".to_string(),
        });
    let harness = Harness::new(Arc::new(store));
    let stub = StubScenario::new("stub", Fault::None);

    let report = harness.run_scenario(&stub, Duration::from_secs(1)).await;

    assert!(!report.passed());
    assert!(matches!(
        report.outcome,
        Outcome::Failed {
            phase: Phase::Teardown,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_suite_timeout_override_is_scoped() {
    let harness = Harness::new(Arc::new(indexed_store()));
    let hanging = StubScenario::new("hanging", Fault::HangExercise);
    let torn_down = hanging.torn_down.clone();
    let slow_suite = Suite::new("slow")
        .with_timeout(Duration::from_secs(2))
        .with_scenario(hanging);
    let plain_suite = Suite::new("plain").with_scenario(StubScenario::new("quick", Fault::None));

    let reports = harness.run_all(&[slow_suite, plain_suite]).await;

    assert_eq!(reports[0].timeout, Duration::from_secs(2));
    match &reports[0].scenarios[0].outcome {
        Outcome::Failed { phase, error } => {
            assert_eq!(*phase, Phase::Exercise);
            assert!(matches!(error, HarnessError::Timeout { .. }));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(torn_down.load(Ordering::SeqCst));

    assert_eq!(reports[1].timeout, DEFAULT_SCENARIO_TIMEOUT);
    assert!(reports[1].passed());
    assert_eq!(harness.default_timeout(), DEFAULT_SCENARIO_TIMEOUT);
}

#[tokio::test]
async fn test_fatal_error_skips_remaining_scenarios_and_suites() {
    let store = FailingStore::new(indexed_store())
        .failing_updates(StoreError::Transport("connection refused".to_string()));
    let harness = Harness::new(Arc::new(store.clone()));
    let suites = [
        bulk_suite(BulkFixture::default()),
        simulation_suite(SimulationConfig::default(), Duration::from_secs(30)),
    ];

    let reports = harness.run_all(&suites).await;

    let bulk = &reports[0];
    assert!(matches!(
        bulk.scenarios[0].outcome,
        Outcome::Failed {
            phase: Phase::Setup,
            error: HarnessError::Store(StoreError::Transport(_))
        }
    ));
    assert_eq!(bulk.skipped_count(), 3);
    assert_eq!(reports[1].skipped_count(), 1);
    assert_eq!(store.update_calls(), 1);
}

#[tokio::test]
async fn test_non_fatal_errors_keep_running() {
    let store = FailingStore::new(indexed_store()).failing_updates(StoreError::WriteRejected {
        path: "test".to_string(),
        reason: "rules".to_string(),
    });
    let harness = Harness::new(Arc::new(store));

    let report = harness.run_suite(&bulk_suite(BulkFixture::default())).await;

    assert_eq!(report.failed_count(), 4);
    assert_eq!(report.skipped_count(), 0);
}

#[tokio::test]
async fn test_missing_index_fails_only_query_scenarios() {
    let store = rtdb_harness_core::MemoryStore::new();
    let harness = Harness::new(Arc::new(store.clone()));

    let report = harness.run_suite(&bulk_suite(BulkFixture::default())).await;

    let failed: Vec<&str> = report
        .scenarios
        .iter()
        .filter(|r| !r.passed())
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(failed, vec!["range-query", "bulk-delete"]);
    for scenario in report.scenarios.iter().filter(|r| !r.passed()) {
        assert!(matches!(
            scenario.error(),
            Some(HarnessError::Store(StoreError::MissingIndex { .. }))
        ));
    }
    assert!(store.read(&key("test")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_query_error_fails_only_its_scenarios() {
    let store = FailingStore::new(indexed_store())
        .failing_queries(StoreError::InvalidQuery("orderBy must be a valid JSON encoded path".to_string()));
    let harness = Harness::new(Arc::new(store.clone()));

    let reports = harness
        .run_all(&[bulk_suite(BulkFixture::default()), bulk_suite(BulkFixture::default())])
        .await;

    for report in &reports {
        assert_eq!(report.skipped_count(), 0);
        assert_eq!(report.failed_count(), 2);
        for scenario in report.scenarios.iter().filter(|r| !r.passed()) {
            assert!(!scenario.is_fatal());
            assert!(matches!(
                scenario.outcome,
                Outcome::Failed {
                    phase: Phase::Exercise,
                    error: HarnessError::Store(StoreError::InvalidQuery(_))
                }
            ));
        }
    }
    assert!(store.inner.read(&key("test")).await.unwrap().is_empty());
}
