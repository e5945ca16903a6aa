//! Range queries over an indexed child field.

use std::cmp::Ordering;
use std::time::Instant;

use crate::error::{StoreError, StoreResult};
use crate::record::{FieldValue, KeyPath, Record};
use crate::store::{RealtimeStore, Snapshot};

/// `orderByChild(order_by).startAt(start).endAt(end)` over the children of `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    /// Collection whose direct children are filtered
    pub path: KeyPath,
    /// Child field the range applies to
    pub order_by: String,
    /// Inclusive lower bound
    pub start: FieldValue,
    /// Inclusive upper bound
    pub end: FieldValue,
}

impl RangeQuery {
    pub fn new(
        path: KeyPath,
        order_by: &str,
        start: impl Into<FieldValue>,
        end: impl Into<FieldValue>,
    ) -> Self {
        Self {
            path,
            order_by: order_by.to_string(),
            start: start.into(),
            end: end.into(),
        }
    }

    /// Checks the field name and that `start <= end`.
    pub fn validate(&self) -> StoreResult<()> {
        let field = KeyPath::parse(&self.order_by)?;
        if field.depth() != 1 {
            return Err(StoreError::InvalidQuery(format!(
                "order field must be a single child key, got '{}'",
                self.order_by
            )));
        }
        if self.start.order_cmp(&self.end) == Ordering::Greater {
            return Err(StoreError::InvalidQuery(format!(
                "start bound {} is after end bound {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    /// True if the record's ordering field lies within the bounds.
    pub fn matches(&self, record: &Record) -> bool {
        record
            .order_value(&self.order_by)
            .within(&self.start, &self.end)
    }
}

/// Thin client issuing range queries and logging what came back.
pub struct RangeQueryClient<'a> {
    store: &'a dyn RealtimeStore,
}

impl<'a> RangeQueryClient<'a> {
    pub fn new(store: &'a dyn RealtimeStore) -> Self {
        Self { store }
    }

    /// Runs the query after validating its bounds locally.
    pub async fn run(&self, query: &RangeQuery) -> StoreResult<Snapshot> {
        query.validate()?;
        let started = Instant::now();
        let snapshot = self.store.query(query).await?;
        tracing::info!(
            path = %query.path,
            order_by = %query.order_by,
            start = %query.start,
            end = %query.end,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Found {} records from query",
            snapshot.len()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_path() -> KeyPath {
        KeyPath::parse("test").unwrap()
    }

    #[test]
    fn test_validate_bounds() {
        assert!(RangeQuery::new(test_path(), "id", 1, 5).validate().is_ok());
        assert!(RangeQuery::new(test_path(), "id", 5, 5).validate().is_ok());

        let err = RangeQuery::new(test_path(), "id", 6, 5).validate().unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));

        let err = RangeQuery::new(test_path(), "a/b", 1, 5).validate().unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
        assert!(RangeQuery::new(test_path(), "", 1, 5).validate().is_err());
    }

    #[test]
    fn test_matches_uses_field_order() {
        let query = RangeQuery::new(test_path(), "id", 1, 5);
        assert!(query.matches(&Record::new().with("id", 1)));
        assert!(query.matches(&Record::new().with("id", 5)));
        assert!(!query.matches(&Record::new().with("id", 6)));
        assert!(!query.matches(&Record::new().with("id", "3")));
        assert!(!query.matches(&Record::new().with("name", "test")));
    }
}
