//! dials: a runtime registry of tweakable design values
//!
//! This library provides:
//! - The dial registry with per-dial and whole-registry subscriptions
//! - Persistence of overrides through a host key-value store
//! - A process-wide registry per project scope
//! - Registry settings and dial declaration files
//! - Design-token manifest accessors

pub mod config;
pub mod core;
pub mod error;
pub mod manifest;
pub mod storage;

// Re-export commonly used types
pub use crate::core::{global_registry, global_registry_for, DialRegistry, Subscription};
pub use dials_types::{
    BooleanConfig, ColorConfig, DialConfig, DialRegistration, DialType, DialValue, NumberConfig,
    SpacingConfig, VariantConfig,
};
pub use error::{DialError, RegistryError, StorageError};
