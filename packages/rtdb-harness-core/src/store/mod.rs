//! Store contract and backends.
//!
//! The harness only talks to a store through [`RealtimeStore`]; backends
//! differ in where the data lives (process memory, a remote REST endpoint).

pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::batch::Batch;
use crate::error::{StoreError, StoreResult};
use crate::query::RangeQuery;
use crate::record::{KeyPath, Record};

pub use memory::MemoryStore;

/// External realtime database contract.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Applies every operation of the batch as one atomic update.
    async fn update(&self, batch: &Batch) -> StoreResult<()>;

    /// Returns records under `query.path` whose ordering field lies within the bounds.
    async fn query(&self, query: &RangeQuery) -> StoreResult<Snapshot>;

    /// Returns every record directly beneath `path`.
    async fn read(&self, path: &KeyPath) -> StoreResult<Snapshot>;

    /// Deletes `path` and everything beneath it.
    async fn remove(&self, path: &KeyPath) -> StoreResult<()>;
}

/// Result of a read or query: child key to record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    records: BTreeMap<String, Record>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, record: Record) {
        self.records.insert(key, record);
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.records.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Record)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Decodes a response body. `null` is an empty snapshot.
    pub fn from_json(value: &serde_json::Value) -> StoreResult<Self> {
        match value {
            serde_json::Value::Null => Ok(Self::new()),
            serde_json::Value::Object(children) => {
                let mut snapshot = Self::new();
                for (key, child) in children {
                    snapshot.insert(key.clone(), Record::from_json(child)?);
                }
                Ok(snapshot)
            }
            other => Err(StoreError::Decode(format!(
                "expected an object of records, got {}",
                other
            ))),
        }
    }

    /// Encodes as a response body; an empty snapshot is `null`.
    pub fn to_json(&self) -> serde_json::Value {
        if self.records.is_empty() {
            return serde_json::Value::Null;
        }
        serde_json::Value::Object(
            self.records
                .iter()
                .map(|(key, record)| (key.clone(), record.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Record)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (String, Record)>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
