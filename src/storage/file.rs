//! Key-value store backed by a JSON file on disk

use log::{info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::KeyValueStore;
use crate::error::StorageError;

/// Persistent store for native hosts.
///
/// Entries live in memory and the whole map is rewritten to disk on every
/// mutation, so the file is always a complete JSON object of strings.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, creating an empty one if the file is missing.
    ///
    /// A file that cannot be parsed is treated as empty and will be replaced
    /// on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => {
                    info!("Loaded {} stored entries from {:?}", entries.len(), path);
                    entries
                }
                Err(e) => {
                    warn!("Ignoring unreadable store {:?}: {}", path, e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Open the store at its default location in the platform data directory
    pub fn open_default() -> Result<Self, StorageError> {
        let path = Self::default_path().ok_or(StorageError::Unavailable)?;
        Self::open(path)
    }

    /// Default store path, if the platform has a data directory
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "dials", "dials")
            .map(|dirs| dirs.data_dir().join("store.json"))
    }

    /// Location of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write to a sibling temp file and rename it over the store, so a
        // crash mid-write leaves the previous file intact
        let content = serde_json::to_string_pretty(entries)?;
        let temp = self.temp_path();
        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
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
    fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set("dials:default:gap", "8").unwrap();
        store.set("dials:default:theme", "\"dark\"").unwrap();
        store.remove("dials:default:gap").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.keys().unwrap(), vec!["dials:default:theme".to_string()]);
        assert_eq!(
            reopened.get("dials:default:theme").unwrap().as_deref(),
            Some("\"dark\"")
        );
    }

    #[test]
    fn test_unreadable_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(store.keys().unwrap().is_empty());
        store.set("k", "v").unwrap();
        assert_eq!(FileStore::open(&path).unwrap().get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_write_replaces_file_through_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set("k", "1").unwrap();

        // A half-written temp file from an earlier crash does not shadow the store
        std::fs::write(store.temp_path(), "{\"k\": \"trunc").unwrap();
        assert_eq!(FileStore::open(&path).unwrap().get("k").unwrap().as_deref(), Some("1"));

        store.set("k", "2").unwrap();
        assert!(!store.temp_path().exists());
        assert_eq!(FileStore::open(&path).unwrap().get("k").unwrap().as_deref(), Some("2"));
    }
}
