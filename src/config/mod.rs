//! Configuration management

mod declarations;
mod settings;

pub use declarations::{load_declarations, register_declarations};
pub use settings::{RegistrySettings, StorageBackend, SETTINGS_VERSION};
