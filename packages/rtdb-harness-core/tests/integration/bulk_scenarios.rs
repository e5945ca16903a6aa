//! Bulk write, range query and bulk delete over the `test` collection.

use rtdb_harness_core::harness::Scenario;
use rtdb_harness_core::scenarios::{
    BulkDeleteScenario, BulkFixture, BulkWriteScenario, IdempotentWriteScenario,
    RangeQueryScenario,
};
use rtdb_harness_core::{RangeQuery, RealtimeStore, StoreError};

use super::helpers::{indexed_store, key};

fn keys(snapshot: &rtdb_harness_core::Snapshot) -> Vec<String> {
    let mut keys: Vec<String> = snapshot.keys().cloned().collect();
    keys.sort_by_key(|k| k.parse::<i64>().unwrap_or(i64::MAX));
    keys
}

#[tokio::test]
async fn test_bulk_write_reads_back_every_record() {
    let store = indexed_store();
    let scenario = BulkWriteScenario::default();
    let mut ctx = scenario.context();

    scenario.setup(&store, &mut ctx).await.unwrap();
    scenario.exercise(&store, &mut ctx).await.unwrap();
    scenario.assert(&store, &mut ctx).await.unwrap();

    assert_eq!(ctx.full_read.len(), 10);
    let record = ctx.full_read.get("3").unwrap();
    assert_eq!(record.get("id").and_then(|v| v.as_i64()), Some(3));
    assert_eq!(record.get("name").and_then(|v| v.as_str()), Some("test"));

    scenario.teardown(&store, &mut ctx).await.unwrap();
    assert_eq!(store.record_count(), 0);
}

#[tokio::test]
async fn test_range_query_returns_inclusive_window() {
    let store = indexed_store();
    let scenario = RangeQueryScenario::default();
    let mut ctx = scenario.context();

    scenario.setup(&store, &mut ctx).await.unwrap();
    scenario.exercise(&store, &mut ctx).await.unwrap();
    scenario.assert(&store, &mut ctx).await.unwrap();

    assert_eq!(keys(&ctx.window), vec!["1", "2", "3", "4", "5"]);
    scenario.teardown(&store, &mut ctx).await.unwrap();
}

#[tokio::test]
async fn test_bulk_delete_removes_ids_from_read_and_query() {
    let store = indexed_store();
    let scenario = BulkDeleteScenario::default();
    let mut ctx = scenario.context();

    scenario.setup(&store, &mut ctx).await.unwrap();
    scenario.exercise(&store, &mut ctx).await.unwrap();
    scenario.assert(&store, &mut ctx).await.unwrap();

    assert_eq!(ctx.full_read.len(), 7);
    assert_eq!(keys(&ctx.window), vec!["1", "5"]);
    assert!(store.get(&key("test/3")).is_none());
    scenario.teardown(&store, &mut ctx).await.unwrap();
}

#[tokio::test]
async fn test_idempotent_write_leaves_same_content() {
    let store = indexed_store();
    let scenario = IdempotentWriteScenario::default();
    let mut ctx = scenario.context();

    scenario.setup(&store, &mut ctx).await.unwrap();
    scenario.exercise(&store, &mut ctx).await.unwrap();
    scenario.assert(&store, &mut ctx).await.unwrap();

    assert_eq!(ctx.baseline, ctx.full_read);
    assert_eq!(store.updates_applied(), 2);
    scenario.teardown(&store, &mut ctx).await.unwrap();
}

#[tokio::test]
async fn test_bulk_delete_assert_catches_lingering_record() {
    let store = indexed_store();
    let scenario = BulkDeleteScenario::default();
    let mut ctx = scenario.context();

    scenario.setup(&store, &mut ctx).await.unwrap();
    scenario.exercise(&store, &mut ctx).await.unwrap();
    // Pretend the store ignored one delete.
    ctx.window = store
        .query(&RangeQuery::new(key("test"), "id", 1, 5))
        .await
        .unwrap();
    let survivor = rtdb_harness_core::Record::new().with("id", 3).with("name", "test");
    ctx.full_read.insert("3".to_string(), survivor);

    assert!(scenario.assert(&store, &mut ctx).await.is_err());
    scenario.teardown(&store, &mut ctx).await.unwrap();
}

#[tokio::test]
async fn test_larger_fixture() {
    let store = indexed_store();
    let scenario = RangeQueryScenario {
        fixture: BulkFixture {
            collection: key("test"),
            record_count: 100,
        },
        start: 40,
        end: 59,
    };
    let mut ctx = scenario.context();

    scenario.setup(&store, &mut ctx).await.unwrap();
    scenario.exercise(&store, &mut ctx).await.unwrap();
    scenario.assert(&store, &mut ctx).await.unwrap();
    assert_eq!(ctx.window.len(), 20);
    scenario.teardown(&store, &mut ctx).await.unwrap();
}

#[tokio::test]
async fn test_reversed_bounds_rejected() {
    let store = indexed_store();
    let err = store
        .query(&RangeQuery::new(key("test"), "id", 5, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidQuery(_)));
}
