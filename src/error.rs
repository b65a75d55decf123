//! Error types for registry and storage operations

use dials_types::DialType;
use thiserror::Error;

/// Failure of a registry call. These are surfaced to the caller and never
/// leave the registry half-updated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DialError {
    /// Malformed dial declaration
    #[error("invalid config for dial '{id}': {reason}")]
    InvalidConfig { id: String, reason: String },

    /// Same id registered again with a different type
    #[error("dial '{id}' is registered as {existing}, cannot register it as {requested}")]
    DuplicateTypeMismatch {
        id: String,
        existing: DialType,
        requested: DialType,
    },

    #[error("unknown dial '{0}'")]
    UnknownDial(String),

    /// Value shape does not match the dial's type
    #[error("dial '{id}' expects a {expected} value, got {found}")]
    TypeMismatch {
        id: String,
        expected: DialType,
        found: &'static str,
    },

    #[error("value {value} for dial '{id}' is outside {}", format_range(.min, .max))]
    ValueOutOfRange {
        id: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    #[error("'{value}' is not an option of dial '{id}' (expected one of {options:?})")]
    InvalidOption {
        id: String,
        value: String,
        options: Vec<String>,
    },
}

fn format_range(min: &Option<f64>, max: &Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("[{}, {}]", min, max),
        (Some(min), None) => format!("[{}, ..)", min),
        (None, Some(max)) => format!("(.., {}]", max),
        (None, None) => "the finite range".to_string(),
    }
}

impl DialError {
    pub(crate) fn invalid_config(id: &str, reason: impl Into<String>) -> Self {
        DialError::InvalidConfig {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure of the host key-value store. Logged by the storage adapter and
/// never propagated out of a registry call.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No persistent store in this host
    #[error("persistent storage is unavailable")]
    Unavailable,

    #[error("storage quota exceeded writing '{0}'")]
    QuotaExceeded(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of the process-wide registry slots
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry for this scope is being constructed by the current call stack
    #[error("registry '{0}' requested while it is being constructed")]
    Reentrant(String),
}
