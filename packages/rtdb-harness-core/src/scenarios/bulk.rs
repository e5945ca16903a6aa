//! Small fixture scenarios over `{id, name}` records keyed `1..=N`.

use async_trait::async_trait;

use crate::batch::Batch;
use crate::error::{AssertionFailure, HarnessError, HarnessResult};
use crate::generator::numbered_records;
use crate::harness::{expect_absent, expect_count, expect_keys, Scenario};
use crate::query::{RangeQuery, RangeQueryClient};
use crate::record::{KeyPath, Record};
use crate::store::{RealtimeStore, Snapshot};
use crate::writer::BatchWriter;

/// Numbered records `collection/1 ..= collection/record_count`.
#[derive(Debug, Clone)]
pub struct BulkFixture {
    pub collection: KeyPath,
    pub record_count: i64,
}

impl Default for BulkFixture {
    fn default() -> Self {
        Self {
            collection: KeyPath::parse("test").unwrap_or_default(),
            record_count: 10,
        }
    }
}

impl BulkFixture {
    pub fn batch(&self) -> HarnessResult<Batch> {
        numbered_records(&self.collection, 1..=self.record_count)
    }

    async fn write(&self, store: &dyn RealtimeStore) -> HarnessResult<()> {
        BatchWriter::new(store).write(&self.batch()?).await?;
        Ok(())
    }

    async fn remove(&self, store: &dyn RealtimeStore) -> HarnessResult<()> {
        store.remove(&self.collection).await?;
        Ok(())
    }

    fn id_query(&self, start: i64, end: i64) -> RangeQuery {
        RangeQuery::new(self.collection.clone(), "id", start, end)
    }

    fn ids_in(&self, start: i64, end: i64) -> impl Iterator<Item = i64> {
        start.max(1)..=end.min(self.record_count)
    }
}

/// Observations gathered during the exercise phase.
#[derive(Debug, Default)]
pub struct BulkContext {
    pub baseline: Snapshot,
    pub full_read: Snapshot,
    pub window: Snapshot,
}

/// Bulk write then full read returns every record.
#[derive(Debug, Clone, Default)]
pub struct BulkWriteScenario {
    pub fixture: BulkFixture,
}

#[async_trait]
impl Scenario for BulkWriteScenario {
    type Context = BulkContext;

    fn name(&self) -> &str {
        "bulk-write"
    }

    fn context(&self) -> BulkContext {
        BulkContext::default()
    }

    async fn setup(&self, store: &dyn RealtimeStore, _ctx: &mut BulkContext) -> HarnessResult<()> {
        self.fixture.write(store).await
    }

    async fn exercise(&self, store: &dyn RealtimeStore, ctx: &mut BulkContext) -> HarnessResult<()> {
        ctx.full_read = store.read(&self.fixture.collection).await?;
        Ok(())
    }

    async fn assert(&self, _store: &dyn RealtimeStore, ctx: &mut BulkContext) -> HarnessResult<()> {
        expect_count(
            "full read after bulk write",
            self.fixture.record_count as usize,
            &ctx.full_read,
        )
    }

    async fn teardown(&self, store: &dyn RealtimeStore, _ctx: &mut BulkContext) -> HarnessResult<()> {
        self.fixture.remove(store).await
    }
}

/// Range query over `id` returns exactly the ids inside the bounds.
#[derive(Debug, Clone)]
pub struct RangeQueryScenario {
    pub fixture: BulkFixture,
    pub start: i64,
    pub end: i64,
}

impl Default for RangeQueryScenario {
    fn default() -> Self {
        Self {
            fixture: BulkFixture::default(),
            start: 1,
            end: 5,
        }
    }
}

#[async_trait]
impl Scenario for RangeQueryScenario {
    type Context = BulkContext;

    fn name(&self) -> &str {
        "range-query"
    }

    fn context(&self) -> BulkContext {
        BulkContext::default()
    }

    async fn setup(&self, store: &dyn RealtimeStore, _ctx: &mut BulkContext) -> HarnessResult<()> {
        self.fixture.write(store).await
    }

    async fn exercise(&self, store: &dyn RealtimeStore, ctx: &mut BulkContext) -> HarnessResult<()> {
        let query = self.fixture.id_query(self.start, self.end);
        ctx.window = RangeQueryClient::new(store).run(&query).await?;
        Ok(())
    }

    async fn assert(&self, _store: &dyn RealtimeStore, ctx: &mut BulkContext) -> HarnessResult<()> {
        let expected = self
            .fixture
            .ids_in(self.start, self.end)
            .map(|id| id.to_string());
        expect_keys("id range query", expected, &ctx.window)
    }

    async fn teardown(&self, store: &dyn RealtimeStore, _ctx: &mut BulkContext) -> HarnessResult<()> {
        self.fixture.remove(store).await
    }
}

/// One update re-writes the survivors and deletes `deleted`; reads and the
/// id range query must no longer see the deleted ids.
#[derive(Debug, Clone)]
pub struct BulkDeleteScenario {
    pub fixture: BulkFixture,
    pub deleted: Vec<i64>,
    pub start: i64,
    pub end: i64,
}

impl Default for BulkDeleteScenario {
    fn default() -> Self {
        Self {
            fixture: BulkFixture::default(),
            deleted: vec![2, 3, 4],
            start: 1,
            end: 5,
        }
    }
}

impl BulkDeleteScenario {
    fn update_batch(&self) -> HarnessResult<Batch> {
        let mut batch = Batch::new();
        for id in 1..=self.fixture.record_count {
            let key = self.fixture.collection.child(&id.to_string())?;
            if self.deleted.contains(&id) {
                batch.delete(key);
            } else {
                batch.upsert(key, Record::new().with("id", id).with("name", "test"));
            }
        }
        Ok(batch)
    }

    fn deleted_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.deleted.iter().map(|id| id.to_string())
    }
}

#[async_trait]
impl Scenario for BulkDeleteScenario {
    type Context = BulkContext;

    fn name(&self) -> &str {
        "bulk-delete"
    }

    fn context(&self) -> BulkContext {
        BulkContext::default()
    }

    async fn setup(&self, store: &dyn RealtimeStore, _ctx: &mut BulkContext) -> HarnessResult<()> {
        self.fixture.write(store).await
    }

    async fn exercise(&self, store: &dyn RealtimeStore, ctx: &mut BulkContext) -> HarnessResult<()> {
        BatchWriter::new(store).write(&self.update_batch()?).await?;
        ctx.full_read = store.read(&self.fixture.collection).await?;
        let query = self.fixture.id_query(self.start, self.end);
        ctx.window = RangeQueryClient::new(store).run(&query).await?;
        Ok(())
    }

    async fn assert(&self, _store: &dyn RealtimeStore, ctx: &mut BulkContext) -> HarnessResult<()> {
        let removed = (1..=self.fixture.record_count)
            .filter(|id| self.deleted.contains(id))
            .count();
        expect_count(
            "full read after bulk delete",
            self.fixture.record_count as usize - removed,
            &ctx.full_read,
        )?;
        expect_absent("deleted ids in full read", self.deleted_keys(), &ctx.full_read)?;

        let survivors = self
            .fixture
            .ids_in(self.start, self.end)
            .filter(|id| !self.deleted.contains(id))
            .map(|id| id.to_string());
        expect_keys("id range query after bulk delete", survivors, &ctx.window)
    }

    async fn teardown(&self, store: &dyn RealtimeStore, _ctx: &mut BulkContext) -> HarnessResult<()> {
        self.fixture.remove(store).await
    }
}

/// Applying the same upsert-only batch twice leaves the same content as once.
#[derive(Debug, Clone, Default)]
pub struct IdempotentWriteScenario {
    pub fixture: BulkFixture,
}

#[async_trait]
impl Scenario for IdempotentWriteScenario {
    type Context = BulkContext;

    fn name(&self) -> &str {
        "idempotent-write"
    }

    fn context(&self) -> BulkContext {
        BulkContext::default()
    }

    async fn setup(&self, store: &dyn RealtimeStore, ctx: &mut BulkContext) -> HarnessResult<()> {
        self.fixture.write(store).await?;
        ctx.baseline = store.read(&self.fixture.collection).await?;
        Ok(())
    }

    async fn exercise(&self, store: &dyn RealtimeStore, ctx: &mut BulkContext) -> HarnessResult<()> {
        self.fixture.write(store).await?;
        ctx.full_read = store.read(&self.fixture.collection).await?;
        Ok(())
    }

    async fn assert(&self, _store: &dyn RealtimeStore, ctx: &mut BulkContext) -> HarnessResult<()> {
        expect_keys(
            "keys after repeated write",
            ctx.baseline.keys(),
            &ctx.full_read,
        )?;
        let changed: Vec<String> = ctx
            .baseline
            .iter()
            .filter(|(key, record)| ctx.full_read.get(key) != Some(*record))
            .map(|(key, _)| key.clone())
            .collect();
        if changed.is_empty() {
            return Ok(());
        }
        Err(HarnessError::Assertion(AssertionFailure {
            check: "record content after repeated write".to_string(),
            expected: 0,
            actual: changed.len(),
            unexpected_keys: changed,
            missing_keys: Vec::new(),
        }))
    }

    async fn teardown(&self, store: &dyn RealtimeStore, _ctx: &mut BulkContext) -> HarnessResult<()> {
        self.fixture.remove(store).await
    }
}
