//! Registry settings: scope, storage backend and store location

use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::DialRegistry;
use crate::storage::{FileStore, MemoryStore, SharedStore, DEFAULT_NAMESPACE};

/// Current settings format version
pub const SETTINGS_VERSION: u32 = 1;

/// Where dial overrides are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON file in the platform data directory, or `storage_path`
    #[default]
    File,
    /// Process memory only
    Memory,
    /// No store at all; overrides are never persisted
    None,
}

/// How the registry is scoped and persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Version of the settings format
    #[serde(default = "default_version")]
    pub version: u32,
    /// Prefix of every storage key
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Project scope; unset means the shared default scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub storage: StorageBackend,
    /// Store file for the `file` backend; defaults to the platform data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            namespace: default_namespace(),
            project_id: None,
            storage: StorageBackend::default(),
            storage_path: None,
        }
    }
}

impl RegistrySettings {
    /// Load settings from disk, falling back to defaults on any failure
    pub fn load() -> Self {
        match Self::try_load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings.json, using built-in defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load settings from disk; a missing file yields the defaults
    pub fn try_load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Load settings from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: RegistrySettings = serde_json::from_str(&content)?;
        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save settings to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Get the settings file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("dev", "dials", "dials")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("settings.json"))
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Open the configured store.
    ///
    /// A file store that cannot be opened degrades to no store, with a warning.
    pub fn open_store(&self) -> Option<SharedStore> {
        match self.storage {
            StorageBackend::None => None,
            StorageBackend::Memory => Some(Arc::new(MemoryStore::new())),
            StorageBackend::File => {
                let opened = match &self.storage_path {
                    Some(path) => FileStore::open(path),
                    None => FileStore::open_default(),
                };
                match opened {
                    Ok(store) => Some(Arc::new(store)),
                    Err(e) => {
                        warn!("Failed to open dial store: {}", e);
                        None
                    }
                }
            }
        }
    }

    /// Build a registry scoped and persisted as configured
    pub fn build_registry(&self) -> DialRegistry {
        let mut builder = DialRegistry::builder()
            .namespace(self.namespace.clone())
            .maybe_store(self.open_store());
        if let Some(project_id) = &self.project_id {
            builder = builder.project_id(project_id.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dials_types::{DialValue, NumberConfig};

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: RegistrySettings = serde_json::from_str(r#"{"project_id":"site"}"#).unwrap();
        assert_eq!(settings.version, SETTINGS_VERSION);
        assert_eq!(settings.namespace, "dials");
        assert_eq!(settings.project_id.as_deref(), Some("site"));
        assert_eq!(settings.storage, StorageBackend::File);
        assert!(settings.storage_path.is_none());
    }

    #[test]
    fn test_save_and_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = RegistrySettings {
            storage: StorageBackend::Memory,
            ..RegistrySettings::default()
        }
        .with_project_id("docs");
        settings.save_to_path(&path).unwrap();

        let loaded = RegistrySettings::load_from_path(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_from_path_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(RegistrySettings::load_from_path(&path).is_err());
    }

    #[test]
    fn test_no_storage_backend() {
        let settings = RegistrySettings {
            storage: StorageBackend::None,
            ..RegistrySettings::default()
        };
        assert!(settings.open_store().is_none());
        assert!(!settings.build_registry().is_persistent());
    }

    #[test]
    fn test_file_backend_persists_across_registries() {
        let dir = tempfile::tempdir().unwrap();
        let settings = RegistrySettings {
            storage_path: Some(dir.path().join("store.json")),
            ..RegistrySettings::default()
        }
        .with_project_id("site");

        let first = settings.build_registry();
        assert!(first.is_persistent());
        first
            .register_number("gap", NumberConfig::new("Gap", 8.0))
            .unwrap();
        first.set_value("gap", 24.0).unwrap();

        let second = settings.build_registry();
        assert_eq!(second.project_id().as_deref(), Some("site"));
        assert_eq!(
            second.register_number("gap", NumberConfig::new("Gap", 8.0)).unwrap(),
            24.0
        );
        assert_eq!(second.get_value("gap"), Some(DialValue::Number(24.0)));
    }
}
