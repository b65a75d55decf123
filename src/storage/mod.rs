//! Persistence of dial overrides
//!
//! The host supplies a [`KeyValueStore`] of plain strings. The
//! [`StorageAdapter`] owns the key scheme, the value envelope and the
//! override cache consulted when a dial is first registered.

mod adapter;
mod file;
mod memory;

pub use adapter::{scope_prefix, storage_key, StorageAdapter, DEFAULT_NAMESPACE, DEFAULT_PROJECT, SCHEMA_VERSION};
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StorageError;
use std::sync::Arc;

/// Synchronous string key-value store provided by the host.
///
/// Serialization is the adapter's job; implementations only move strings.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All keys currently in the store
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Shared handle to a host store
pub type SharedStore = Arc<dyn KeyValueStore>;
