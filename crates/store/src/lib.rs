//! Call context store
//!
//! Durable-but-ephemeral per-call state, keyed by call id, with TTL-based
//! expiry. The store itself reports failures as `StoreError`; the engine is
//! the fail-soft layer and treats a failed load as "no context".
//!
//! The persisted form is a versioned JSON envelope so the context schema
//! can evolve across deploys without implicit shape compatibility.

pub mod context_store;
pub mod memory;

pub use context_store::{decode_context, encode_context, ContextStore};
pub use memory::InMemoryContextStore;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("store I/O error: {0}")]
    Io(String),
    #[error("unsupported context schema version {found}, expected {expected}")]
    SchemaVersion { found: u32, expected: u32 },
}
