//! In-process key-value store

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::KeyValueStore;
use crate::error::StorageError;

/// Shared in-memory store.
///
/// Clones share the same entries, so several registries built on clones of
/// one `MemoryStore` see each other's writes the way pages share one
/// browser storage area.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
    /// Maximum number of entries; writes beyond it fail with QuotaExceeded
    capacity: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that refuses to grow past `capacity` entries
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            entries: Arc::default(),
            capacity: Some(capacity),
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(capacity) = self.capacity {
            if !entries.contains_key(key) && entries.len() >= capacity {
                return Err(StorageError::QuotaExceeded(key.to_string()));
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("a", "1").unwrap();
        assert_eq!(other.get("a").unwrap().as_deref(), Some("1"));
        other.remove("a").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_capacity_limit() {
        let store = MemoryStore::with_capacity_limit(1);
        store.set("a", "1").unwrap();
        // Overwriting an existing key does not grow the store
        store.set("a", "2").unwrap();
        assert!(matches!(store.set("b", "1"), Err(StorageError::QuotaExceeded(_))));
        assert_eq!(store.keys().unwrap(), vec!["a".to_string()]);
    }
}
