//! Verification harness for realtime JSON tree databases.
//!
//! Generates synthetic records, writes them as chunked multi-key updates,
//! runs range queries over an indexed field and checks what comes back,
//! including after bulk deletes.

pub mod batch;
pub mod config;
pub mod credentials;
pub mod error;
pub mod generator;
pub mod harness;
pub mod query;
pub mod record;
pub mod scenarios;
pub mod store;
pub mod writer;

pub use batch::{Batch, Operation};
pub use config::HarnessConfig;
pub use error::{ConfigError, HarnessError, StoreError};
pub use harness::{Harness, Suite, SuiteReport};
pub use query::RangeQuery;
pub use record::{FieldValue, KeyPath, Record};
pub use store::{MemoryStore, RealtimeStore, Snapshot};
