//! REST transport for the realtime database harness.
//!
//! [`RestStore`] drives a remote database over its `.json` REST dialect.
//! [`Server`] serves the same dialect from a local [`MemoryStore`] so the
//! harness can run end to end without a hosted database.
//!
//! [`MemoryStore`]: rtdb_harness_core::MemoryStore

pub mod client;
pub mod handlers;
pub mod router;
pub mod server;

pub use client::RestStore;
pub use router::Router;
pub use server::Server;
