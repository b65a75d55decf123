//! Storage adapter: key scheme, value envelope and override cache

use dials_types::{DialType, DialValue};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::SharedStore;
use crate::error::StorageError;

/// Namespace prefix of every key written by the registry
pub const DEFAULT_NAMESPACE: &str = "dials";

/// Project segment used when no project id is configured
pub const DEFAULT_PROJECT: &str = "default";

/// Current persisted value format version
pub const SCHEMA_VERSION: u32 = 1;

/// Escape the separator so namespace and project segments cannot alias
fn escape_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace(':', "%3A")
}

/// Key prefix shared by all dials of one scope: `<namespace>:<project>:`
pub fn scope_prefix(namespace: &str, project_id: Option<&str>) -> String {
    format!(
        "{}:{}:",
        escape_segment(namespace),
        escape_segment(project_id.unwrap_or(DEFAULT_PROJECT))
    )
}

/// Storage key of one dial: `<namespace>:<project>:<dialId>`
pub fn storage_key(namespace: &str, project_id: Option<&str>, dial_id: &str) -> String {
    format!("{}{}", scope_prefix(namespace, project_id), dial_id)
}

/// Versioned on-disk form of an override
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    #[serde(rename = "type")]
    dial_type: DialType,
    value: DialValue,
}

/// Override as read back from the store
#[derive(Debug, Clone, PartialEq)]
struct StoredOverride {
    /// None for bare scalars written before the envelope existed
    dial_type: Option<DialType>,
    value: DialValue,
}

impl StoredOverride {
    fn parse(raw: &str) -> Option<Self> {
        if let Ok(envelope) = serde_json::from_str::<Envelope>(raw) {
            if envelope.version > SCHEMA_VERSION {
                return None;
            }
            return Some(Self {
                dial_type: Some(envelope.dial_type),
                value: envelope.value,
            });
        }

        serde_json::from_str::<DialValue>(raw)
            .ok()
            .map(|value| Self { dial_type: None, value })
    }
}

fn encode(dial_type: DialType, value: &DialValue) -> Result<String, StorageError> {
    let envelope = Envelope {
        version: SCHEMA_VERSION,
        dial_type,
        value: value.clone(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Translates dial values to and from the host store for one scope.
///
/// Without a store every read misses and every write is dropped; the
/// registry behaves the same apart from overrides not outliving the process.
pub struct StorageAdapter {
    store: Option<SharedStore>,
    namespace: String,
    project_id: Option<String>,
    prefix: String,
    overrides: HashMap<String, StoredOverride>,
}

impl StorageAdapter {
    /// Adapter for one scope; `None` disables persistence with one warning
    pub fn new(store: Option<SharedStore>, namespace: &str, project_id: Option<&str>) -> Self {
        if store.is_none() {
            warn!(
                "{}; dial overrides for scope '{}' will not be persisted",
                StorageError::Unavailable,
                scope_prefix(namespace, project_id)
            );
        }

        Self {
            store,
            namespace: namespace.to_string(),
            project_id: project_id.map(str::to_string),
            prefix: scope_prefix(namespace, project_id),
            overrides: HashMap::new(),
        }
    }

    /// True if a host store is attached
    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    /// Key namespace of this scope
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Project of this scope, `None` for the default scope
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }

    /// Populate the override cache from every key in this scope.
    ///
    /// Entries that fail to parse are skipped. Returns the number loaded.
    pub fn load_from_storage(&mut self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };

        let keys = match store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Failed to list stored dial overrides: {}", e);
                return 0;
            }
        };

        self.overrides.clear();
        for key in keys {
            let Some(id) = key.strip_prefix(&self.prefix) else {
                continue;
            };
            let raw = match store.get(&key) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to read stored override {}: {}", key, e);
                    continue;
                }
            };
            match StoredOverride::parse(&raw) {
                Some(stored) => {
                    self.overrides.insert(id.to_string(), stored);
                }
                None => debug!("Ignoring unreadable stored override {}: {:?}", key, raw),
            }
        }

        info!(
            "Loaded {} dial overrides for scope '{}'",
            self.overrides.len(),
            self.prefix
        );
        self.overrides.len()
    }

    /// Persisted value for `id`, if one exists and has the shape of `dial_type`.
    ///
    /// An override recorded for a different type is discarded from the store.
    /// An accepted bare scalar is rewritten in the versioned format.
    pub fn get_persisted_value(&mut self, id: &str, dial_type: DialType) -> Option<DialValue> {
        let stored = self.overrides.get(id)?.clone();

        let compatible = match stored.dial_type {
            Some(recorded) => recorded == dial_type && dial_type.accepts(&stored.value),
            None => dial_type.accepts(&stored.value),
        };
        if !compatible {
            warn!(
                "Discarding stored override for dial '{}': stored as {}, registered as {}",
                id,
                stored
                    .dial_type
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| stored.value.kind().to_string()),
                dial_type
            );
            self.remove_value(id);
            return None;
        }

        if stored.dial_type.is_none() {
            debug!("Upgrading unversioned override for dial '{}'", id);
            self.persist_value(id, dial_type, &stored.value);
        }

        Some(stored.value)
    }

    /// Write an override. Store failures are logged, never returned.
    pub fn persist_value(&mut self, id: &str, dial_type: DialType, value: &DialValue) {
        let Some(store) = &self.store else {
            return;
        };

        self.overrides.insert(
            id.to_string(),
            StoredOverride {
                dial_type: Some(dial_type),
                value: value.clone(),
            },
        );
        let key = self.key(id);
        let result = encode(dial_type, value).and_then(|raw| store.set(&key, &raw));
        if let Err(e) = result {
            warn!("Failed to persist dial '{}': {}", id, e);
        }
    }

    /// Drop the override for `id`
    pub fn remove_value(&mut self, id: &str) {
        self.overrides.remove(id);

        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.remove(&self.key(id)) {
            warn!("Failed to remove stored override for dial '{}': {}", id, e);
        }
    }

    /// Erase every override in this scope, leaving other scopes untouched
    pub fn clear(&mut self) {
        self.overrides.clear();

        let Some(store) = &self.store else {
            return;
        };
        let keys = match store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Failed to list stored dial overrides: {}", e);
                return;
            }
        };

        let mut removed = 0;
        for key in keys.iter().filter(|k| k.starts_with(&self.prefix)) {
            match store.remove(key) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove stored override {}: {}", key, e),
            }
        }
        info!("Cleared {} stored dial overrides for scope '{}'", removed, self.prefix);
    }

    /// Ids with a cached override, sorted
    pub fn persisted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.overrides.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    fn adapter(store: &MemoryStore, project: Option<&str>) -> StorageAdapter {
        StorageAdapter::new(Some(Arc::new(store.clone())), DEFAULT_NAMESPACE, project)
    }

    #[test]
    fn test_key_scheme() {
        assert_eq!(storage_key("dials", None, "gap"), "dials:default:gap");
        assert_eq!(storage_key("dials", Some("site"), "gap"), "dials:site:gap");
        // A separator inside the project id cannot shift the dial id
        assert_ne!(
            storage_key("dials", Some("a:b"), "c"),
            storage_key("dials", Some("a"), "b:c")
        );
    }

    #[test]
    fn test_persist_writes_versioned_envelope() {
        let store = MemoryStore::new();
        let mut storage = adapter(&store, None);
        storage.persist_value("gap", DialType::Number, &DialValue::Number(12.5));

        let raw = store.get("dials:default:gap").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["type"], "number");
        assert_eq!(json["value"], 12.5);
    }

    #[test]
    fn test_load_skips_garbage_and_other_scopes() {
        let store = MemoryStore::new();
        store.set("dials:default:broken", "{not json").unwrap();
        store.set("dials:default:future", r#"{"version":99,"type":"boolean","value":true}"#).unwrap();
        store.set("dials:other:gap", r#"{"version":1,"type":"number","value":3}"#).unwrap();
        store.set("dials:default:gap", r#"{"version":1,"type":"number","value":4}"#).unwrap();

        let mut storage = adapter(&store, None);
        assert_eq!(storage.load_from_storage(), 1);
        assert_eq!(storage.persisted_ids(), vec!["gap".to_string()]);
        assert_eq!(
            storage.get_persisted_value("gap", DialType::Number),
            Some(DialValue::Number(4.0))
        );
    }

    #[test]
    fn test_type_mismatch_is_discarded() {
        let store = MemoryStore::new();
        store.set("dials:default:gap", r#"{"version":1,"type":"spacing","value":"4px"}"#).unwrap();

        let mut storage = adapter(&store, None);
        storage.load_from_storage();
        assert_eq!(storage.get_persisted_value("gap", DialType::Number), None);
        assert!(store.get("dials:default:gap").unwrap().is_none());
    }

    #[test]
    fn test_bare_scalar_is_upgraded() {
        let store = MemoryStore::new();
        store.set("dials:default:theme", "\"light\"").unwrap();

        let mut storage = adapter(&store, None);
        storage.load_from_storage();
        assert_eq!(
            storage.get_persisted_value("theme", DialType::Variant),
            Some(DialValue::from("light"))
        );

        let raw = store.get("dials:default:theme").unwrap().unwrap();
        assert!(raw.contains("\"version\":1"));
        assert!(raw.contains("\"type\":\"variant\""));
    }

    #[test]
    fn test_clear_only_touches_own_scope() {
        let store = MemoryStore::new();
        let mut a = adapter(&store, Some("a"));
        let mut b = adapter(&store, Some("b"));
        a.persist_value("x", DialType::Number, &DialValue::Number(5.0));
        b.persist_value("x", DialType::Number, &DialValue::Number(7.0));

        a.clear();
        assert!(a.persisted_ids().is_empty());
        assert!(store.get("dials:a:x").unwrap().is_none());
        assert!(store.get("dials:b:x").unwrap().is_some());
    }

    #[test]
    fn test_write_failure_keeps_cache() {
        let store = MemoryStore::with_capacity_limit(0);
        let mut storage = adapter(&store, None);
        storage.persist_value("gap", DialType::Number, &DialValue::Number(1.0));

        assert!(store.is_empty());
        assert_eq!(
            storage.get_persisted_value("gap", DialType::Number),
            Some(DialValue::Number(1.0))
        );
    }

    #[test]
    fn test_missing_store_is_a_no_op() {
        let mut storage = StorageAdapter::new(None, DEFAULT_NAMESPACE, None);
        assert!(!storage.is_available());
        assert_eq!(storage.load_from_storage(), 0);
        storage.persist_value("gap", DialType::Number, &DialValue::Number(1.0));
        storage.remove_value("gap");
        storage.clear();
        assert!(storage.persisted_ids().is_empty());
    }
}
