//! Cardinality and content checks producing [`AssertionFailure`]s.

use std::collections::BTreeSet;

use crate::error::{AssertionFailure, HarnessError, HarnessResult};
use crate::store::Snapshot;

fn failure(check: &str, expected: usize, actual: usize) -> AssertionFailure {
    AssertionFailure {
        check: check.to_string(),
        expected,
        actual,
        unexpected_keys: Vec::new(),
        missing_keys: Vec::new(),
    }
}

/// Observed count equals the expected count.
pub fn expect_cardinality(check: &str, expected: usize, actual: usize) -> HarnessResult<()> {
    if actual == expected {
        return Ok(());
    }
    Err(HarnessError::Assertion(failure(check, expected, actual)))
}

/// Snapshot holds exactly `expected` records.
pub fn expect_count(check: &str, expected: usize, snapshot: &Snapshot) -> HarnessResult<()> {
    expect_cardinality(check, expected, snapshot.len())
}

/// Snapshot holds exactly the given keys.
pub fn expect_keys<I, K>(check: &str, expected: I, snapshot: &Snapshot) -> HarnessResult<()>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let expected: BTreeSet<String> = expected
        .into_iter()
        .map(|k| k.as_ref().to_string())
        .collect();
    let missing_keys: Vec<String> = expected
        .iter()
        .filter(|k| !snapshot.contains_key(k))
        .cloned()
        .collect();
    let unexpected_keys: Vec<String> = snapshot
        .keys()
        .filter(|k| !expected.contains(*k))
        .cloned()
        .collect();
    if missing_keys.is_empty() && unexpected_keys.is_empty() {
        return Ok(());
    }
    Err(HarnessError::Assertion(AssertionFailure {
        unexpected_keys,
        missing_keys,
        ..failure(check, expected.len(), snapshot.len())
    }))
}

/// None of the given keys are present.
pub fn expect_absent<I, K>(check: &str, keys: I, snapshot: &Snapshot) -> HarnessResult<()>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let unexpected_keys: Vec<String> = keys
        .into_iter()
        .filter(|k| snapshot.contains_key(k.as_ref()))
        .map(|k| k.as_ref().to_string())
        .collect();
    if unexpected_keys.is_empty() {
        return Ok(());
    }
    for key in &unexpected_keys {
        tracing::warn!("Record: {} found in results but should not exist", key);
    }
    Err(HarnessError::Assertion(AssertionFailure {
        actual: unexpected_keys.len(),
        unexpected_keys,
        ..failure(check, 0, 0)
    }))
}
