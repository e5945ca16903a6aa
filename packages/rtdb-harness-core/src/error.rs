//! Harness error types.

use std::time::Duration;

use thiserror::Error;

/// Errors reported by a store backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Connection, timeout or protocol failure talking to the store
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credential rejected or missing
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Multi-key update rejected
    #[error("Write rejected at '{path}': {reason}")]
    WriteRejected { path: String, reason: String },

    /// Read refused by the store (size limits, server errors)
    #[error("Read rejected at '{path}': {reason}")]
    ReadRejected { path: String, reason: String },

    /// Range query on a field without a declared index
    #[error("Index not defined for field '{field}' at path '{path}'")]
    MissingIndex { path: String, field: String },

    /// Malformed query (e.g. start bound after end bound)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Key path violates the store's key rules
    #[error("Invalid key path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// Returns true for errors that should abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Transport(_) | StoreError::Auth(_))
    }
}

/// Observed content that did not match the expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    /// What was being checked
    pub check: String,
    /// Expected cardinality
    pub expected: usize,
    /// Observed cardinality
    pub actual: usize,
    /// Keys present that should not be
    pub unexpected_keys: Vec<String>,
    /// Keys absent that should be present
    pub missing_keys: Vec<String>,
}

impl std::fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: expected {} records, found {}",
            self.check, self.expected, self.actual
        )?;
        if !self.unexpected_keys.is_empty() {
            write!(f, "; unexpected keys: {}", preview(&self.unexpected_keys))?;
        }
        if !self.missing_keys.is_empty() {
            write!(f, "; missing keys: {}", preview(&self.missing_keys))?;
        }
        Ok(())
    }
}

fn preview(keys: &[String]) -> String {
    const SHOWN: usize = 5;
    let mut out = keys
        .iter()
        .take(SHOWN)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if keys.len() > SHOWN {
        out.push_str(&format!(" (+{} more)", keys.len() - SHOWN));
    }
    out
}

/// Scenario-level errors.
#[derive(Error, Debug, Clone)]
pub enum HarnessError {
    /// Store call failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Observed content mismatch
    #[error("Assertion failed: {0}")]
    Assertion(AssertionFailure),

    /// Scenario exceeded its suite timeout
    #[error("Scenario '{scenario}' timed out after {limit:?}")]
    Timeout { scenario: String, limit: Duration },

    /// Generator or scenario misconfiguration
    #[error("Invalid scenario configuration: {0}")]
    InvalidConfig(String),
}

impl HarnessError {
    /// Returns true for errors that should abort the remaining suite.
    pub fn is_fatal(&self) -> bool {
        match self {
            HarnessError::Store(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config or credential file could not be read
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML config could not be parsed
    #[error("Invalid TOML: {0}")]
    Toml(String),

    /// Credential JSON could not be parsed
    #[error("Invalid credential file: {0}")]
    Credential(String),

    /// Environment override could not be parsed
    #[error("Invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },

    /// Loaded values are inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type HarnessResult<T> = Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(StoreError::Transport("refused".into()).is_fatal());
        assert!(StoreError::Auth("denied".into()).is_fatal());
        assert!(!StoreError::InvalidQuery("bounds".into()).is_fatal());
        assert!(HarnessError::from(StoreError::Auth("x".into())).is_fatal());
        assert!(!HarnessError::InvalidConfig("x".into()).is_fatal());
    }

    #[test]
    fn test_assertion_display_truncates_keys() {
        let failure = AssertionFailure {
            check: "sampled keys absent".into(),
            expected: 0,
            actual: 7,
            unexpected_keys: (0..7).map(|i| format!("k{}", i)).collect(),
            missing_keys: Vec::new(),
        };
        let text = failure.to_string();
        assert!(text.contains("expected 0 records, found 7"));
        assert!(text.contains("k0, k1, k2, k3, k4 (+2 more)"));
        assert!(!text.contains("missing"));
    }
}
