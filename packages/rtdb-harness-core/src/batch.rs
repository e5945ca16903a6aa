//! Multi-key update batches.

use std::collections::BTreeMap;

use crate::error::{StoreError, StoreResult};
use crate::record::{KeyPath, Record};

/// One entry of a multi-key update.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Replace the value at the key with this record
    Upsert(Record),
    /// Remove the key and everything beneath it
    Delete,
}

impl Operation {
    pub fn is_delete(&self) -> bool {
        matches!(self, Operation::Delete)
    }
}

/// Key path to operation mapping applied as a single logical update.
///
/// A `Delete` for a key wins over an `Upsert` for the same key no matter
/// which was added first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    ops: BTreeMap<KeyPath, Operation>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, key: KeyPath, record: Record) {
        match self.ops.get(&key) {
            Some(Operation::Delete) => {}
            _ => {
                self.ops.insert(key, Operation::Upsert(record));
            }
        }
    }

    pub fn delete(&mut self, key: KeyPath) {
        self.ops.insert(key, Operation::Delete);
    }

    /// Builder-style [`upsert`](Self::upsert).
    pub fn with_upsert(mut self, key: KeyPath, record: Record) -> Self {
        self.upsert(key, record);
        self
    }

    /// Builder-style [`delete`](Self::delete).
    pub fn with_delete(mut self, key: KeyPath) -> Self {
        self.delete(key);
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn get(&self, key: &KeyPath) -> Option<&Operation> {
        self.ops.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyPath, &Operation)> {
        self.ops.iter()
    }

    pub fn upsert_count(&self) -> usize {
        self.ops.values().filter(|op| !op.is_delete()).count()
    }

    pub fn delete_count(&self) -> usize {
        self.ops.values().filter(|op| op.is_delete()).count()
    }

    /// Rejects batches where one key is an ancestor of another.
    ///
    /// Descendants sort directly after their ancestor, so comparing each key
    /// with its predecessor finds any overlap.
    pub fn validate(&self) -> StoreResult<()> {
        let mut previous: Option<&KeyPath> = None;
        for key in self.ops.keys() {
            if key.is_root() {
                return Err(StoreError::WriteRejected {
                    path: String::new(),
                    reason: "cannot update the root as a batch entry".to_string(),
                });
            }
            if let Some(prev) = previous {
                if key.is_descendant_of(prev) {
                    return Err(StoreError::WriteRejected {
                        path: key.to_string(),
                        reason: format!("path is a descendant of '{}' in the same update", prev),
                    });
                }
            }
            previous = Some(key);
        }
        Ok(())
    }

    /// Wire body for a multi-path update: `{ "a/b": {...}, "a/c": null }`.
    pub fn to_json(&self) -> serde_json::Value {
        let body = self
            .ops
            .iter()
            .map(|(key, op)| {
                let value = match op {
                    Operation::Upsert(record) => record.to_json(),
                    Operation::Delete => serde_json::Value::Null,
                };
                (key.to_string(), value)
            })
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(body)
    }

    /// Parses a multi-path update body, resolving keys against `base`.
    pub fn from_json(base: &KeyPath, body: &serde_json::Value) -> StoreResult<Self> {
        let object = body.as_object().ok_or_else(|| {
            StoreError::Decode("update body must be a JSON object".to_string())
        })?;
        let mut batch = Batch::new();
        for (key, value) in object {
            let path = base.join(&KeyPath::parse(key)?);
            if value.is_null() {
                batch.delete(path);
            } else {
                batch.upsert(path, Record::from_json(value)?);
            }
        }
        Ok(batch)
    }
}

impl FromIterator<(KeyPath, Operation)> for Batch {
    fn from_iter<T: IntoIterator<Item = (KeyPath, Operation)>>(iter: T) -> Self {
        let mut batch = Batch::new();
        for (key, op) in iter {
            match op {
                Operation::Upsert(record) => batch.upsert(key, record),
                Operation::Delete => batch.delete(key),
            }
        }
        batch
    }
}
