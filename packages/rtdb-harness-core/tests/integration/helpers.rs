//! Shared stores and scenarios for the integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use rtdb_harness_core::error::{AssertionFailure, HarnessError, HarnessResult, StoreError, StoreResult};
use rtdb_harness_core::harness::Scenario;
use rtdb_harness_core::{Batch, KeyPath, MemoryStore, RangeQuery, RealtimeStore, Snapshot};

pub fn key(path: &str) -> KeyPath {
    KeyPath::parse(path).unwrap()
}

/// Memory store with the indexes the built-in suites query on.
pub fn indexed_store() -> MemoryStore {
    MemoryStore::new()
        .with_index(key("test"), "id")
        .with_index(key("transactions"), "published")
}

/// Wraps a memory store and fails selected operations.
#[derive(Clone, Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    pub update_error: Option<StoreError>,
    pub query_error: Option<StoreError>,
    pub remove_error: Option<StoreError>,
    pub update_calls: Arc<AtomicUsize>,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn failing_updates(mut self, error: StoreError) -> Self {
        self.update_error = Some(error);
        self
    }

    pub fn failing_queries(mut self, error: StoreError) -> Self {
        self.query_error = Some(error);
        self
    }

    pub fn failing_removes(mut self, error: StoreError) -> Self {
        self.remove_error = Some(error);
        self
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RealtimeStore for FailingStore {
    async fn update(&self, batch: &Batch) -> StoreResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        match &self.update_error {
            Some(e) => Err(e.clone()),
            None => self.inner.update(batch).await,
        }
    }

    async fn query(&self, query: &RangeQuery) -> StoreResult<Snapshot> {
        match &self.query_error {
            Some(e) => Err(e.clone()),
            None => self.inner.query(query).await,
        }
    }

    async fn read(&self, path: &KeyPath) -> StoreResult<Snapshot> {
        self.inner.read(path).await
    }

    async fn remove(&self, path: &KeyPath) -> StoreResult<()> {
        match &self.remove_error {
            Some(e) => Err(e.clone()),
            None => self.inner.remove(path).await,
        }
    }
}

/// How a [`StubScenario`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    FailAssert,
    HangExercise,
}

/// Scenario that records whether teardown ran.
pub struct StubScenario {
    pub name: &'static str,
    pub fault: Fault,
    pub torn_down: Arc<AtomicBool>,
}

impl StubScenario {
    pub fn new(name: &'static str, fault: Fault) -> Self {
        Self {
            name,
            fault,
            torn_down: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scenario for StubScenario {
    type Context = ();

    fn name(&self) -> &str {
        self.name
    }

    fn context(&self) {}

    async fn setup(&self, _store: &dyn RealtimeStore, _ctx: &mut ()) -> HarnessResult<()> {
        Ok(())
    }

    async fn exercise(&self, _store: &dyn RealtimeStore, _ctx: &mut ()) -> HarnessResult<()> {
        if self.fault == Fault::HangExercise {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(())
    }

    async fn assert(&self, _store: &dyn RealtimeStore, _ctx: &mut ()) -> HarnessResult<()> {
        if self.fault == Fault::FailAssert {
            return Err(HarnessError::Assertion(AssertionFailure {
                check: "stub".to_string(),
                expected: 1,
                actual: 0,
                unexpected_keys: Vec::new(),
                missing_keys: vec!["1".to_string()],
            }));
        }
        Ok(())
    }

    async fn teardown(&self, store: &dyn RealtimeStore, _ctx: &mut ()) -> HarnessResult<()> {
        self.torn_down.store(true, Ordering::SeqCst);
        store.remove(&key("stub")).await?;
        Ok(())
    }
}
