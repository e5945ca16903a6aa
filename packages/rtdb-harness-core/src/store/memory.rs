//! In-process store backend.
//!
//! Records are kept in a [`BTreeMap`] keyed by full path, so every subtree is
//! a contiguous key range. Queries scan the children of the requested path;
//! the declared index set only gates which fields may be queried, mirroring
//! the remote service's `.indexOn` rules.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::batch::{Batch, Operation};
use crate::error::{StoreError, StoreResult};
use crate::query::RangeQuery;
use crate::record::{KeyPath, Record};
use crate::store::{RealtimeStore, Snapshot};

#[derive(Default)]
struct Inner {
    records: RwLock<BTreeMap<KeyPath, Record>>,
    indexes: RwLock<HashSet<(KeyPath, String)>>,
    updates_applied: AtomicU64,
}

/// Shared in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`declare_index`](Self::declare_index).
    pub fn with_index(self, path: KeyPath, field: &str) -> Self {
        self.declare_index(path, field);
        self
    }

    /// Allows range queries on `field` for the children of `path`.
    pub fn declare_index(&self, path: KeyPath, field: &str) {
        self.inner.indexes.write().insert((path, field.to_string()));
    }

    pub fn has_index(&self, path: &KeyPath, field: &str) -> bool {
        self.inner
            .indexes
            .read()
            .contains(&(path.clone(), field.to_string()))
    }

    /// Total number of stored records at any depth.
    pub fn record_count(&self) -> usize {
        self.inner.records.read().len()
    }

    /// Number of successful `update` calls.
    pub fn updates_applied(&self) -> u64 {
        self.inner.updates_applied.load(Ordering::Relaxed)
    }

    /// Returns the record stored exactly at `path`.
    pub fn get(&self, path: &KeyPath) -> Option<Record> {
        self.inner.records.read().get(path).cloned()
    }

    fn subtree_keys(records: &BTreeMap<KeyPath, Record>, path: &KeyPath) -> Vec<KeyPath> {
        records
            .range(path.clone()..)
            .take_while(|(key, _)| key.starts_with(path))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn children<'a>(
        records: &'a BTreeMap<KeyPath, Record>,
        path: &'a KeyPath,
    ) -> impl Iterator<Item = (&'a str, &'a Record)> + 'a {
        let depth = path.depth() + 1;
        records
            .range(path.clone()..)
            .take_while(move |(key, _)| key.starts_with(path))
            .filter(move |(key, _)| key.depth() == depth)
            .filter_map(|(key, record)| key.last().map(|last| (last, record)))
    }

    /// Records are leaves: nothing may be written beneath one.
    fn check_not_nested(records: &BTreeMap<KeyPath, Record>, key: &KeyPath) -> StoreResult<()> {
        let mut ancestor = key.parent();
        while let Some(path) = ancestor {
            if path.is_root() {
                break;
            }
            if records.contains_key(&path) {
                return Err(StoreError::WriteRejected {
                    path: key.to_string(),
                    reason: format!("'{}' holds a record", path),
                });
            }
            ancestor = path.parent();
        }
        Ok(())
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn update(&self, batch: &Batch) -> StoreResult<()> {
        batch.validate()?;
        let mut records = self.inner.records.write();
        for (key, _) in batch.iter() {
            Self::check_not_nested(&records, key)?;
        }
        for (key, op) in batch.iter() {
            for doomed in Self::subtree_keys(&records, key) {
                records.remove(&doomed);
            }
            if let Operation::Upsert(record) = op {
                records.insert(key.clone(), record.clone());
            }
        }
        self.inner.updates_applied.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(
            upserts = batch.upsert_count(),
            deletes = batch.delete_count(),
            "Applied batch"
        );
        Ok(())
    }

    async fn query(&self, query: &RangeQuery) -> StoreResult<Snapshot> {
        query.validate()?;
        if !self.has_index(&query.path, &query.order_by) {
            return Err(StoreError::MissingIndex {
                path: query.path.to_string(),
                field: query.order_by.clone(),
            });
        }
        let records = self.inner.records.read();
        let snapshot = Self::children(&records, &query.path)
            .filter(|(_, record)| query.matches(record))
            .map(|(key, record)| (key.to_string(), record.clone()))
            .collect();
        Ok(snapshot)
    }

    async fn read(&self, path: &KeyPath) -> StoreResult<Snapshot> {
        let records = self.inner.records.read();
        let snapshot = Self::children(&records, path)
            .map(|(key, record)| (key.to_string(), record.clone()))
            .collect();
        Ok(snapshot)
    }

    async fn remove(&self, path: &KeyPath) -> StoreResult<()> {
        let mut records = self.inner.records.write();
        let doomed = Self::subtree_keys(&records, path);
        for key in &doomed {
            records.remove(key);
        }
        tracing::debug!(path = %path, removed = doomed.len(), "Removed subtree");
        Ok(())
    }
}
