//! Batch writer: fans chunk updates out to the store and joins them.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::batch::Batch;
use crate::error::StoreResult;
use crate::store::RealtimeStore;

/// Default number of chunk updates in flight at once.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Totals for a completed `write_all`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSummary {
    pub batches: usize,
    pub upserts: usize,
    pub deletes: usize,
    pub elapsed: Duration,
}

/// Applies batches against a store, one atomic update per batch.
pub struct BatchWriter<'a> {
    store: &'a dyn RealtimeStore,
    max_in_flight: usize,
}

impl<'a> BatchWriter<'a> {
    pub fn new(store: &'a dyn RealtimeStore) -> Self {
        Self {
            store,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Caps concurrent updates; values below 1 are treated as 1.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Applies a single batch.
    pub async fn write(&self, batch: &Batch) -> StoreResult<()> {
        self.store.update(batch).await
    }

    async fn write_chunk(&self, index: usize, total: usize, batch: &Batch) -> StoreResult<()> {
        if let Err(e) = self.store.update(batch).await {
            tracing::error!(chunk = index, error = %e, "Chunk update rejected");
            return Err(e);
        }
        tracing::debug!(chunk = index, total, "Processed chunk");
        Ok(())
    }

    /// Applies every batch, up to `max_in_flight` at a time, and waits for all.
    ///
    /// The first rejected batch is returned; batches still in flight are dropped
    /// and no further batches are started.
    pub async fn write_all(&self, batches: &[Batch]) -> StoreResult<WriteSummary> {
        let total = batches.len();
        tracing::info!("Handling {} chunks ...", total);
        let started = Instant::now();

        let writes: Vec<_> = batches
            .iter()
            .enumerate()
            .map(|(index, batch)| self.write_chunk(index, total, batch))
            .collect();
        stream::iter(writes)
            .buffer_unordered(self.max_in_flight)
            .try_for_each(|()| futures::future::ok(()))
            .await?;

        let summary = WriteSummary {
            batches: total,
            upserts: batches.iter().map(Batch::upsert_count).sum(),
            deletes: batches.iter().map(Batch::delete_count).sum(),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            batches = summary.batches,
            upserts = summary.upserts,
            deletes = summary.deletes,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Finished chunks"
        );
        Ok(summary)
    }
}
