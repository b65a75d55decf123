//! dials-types: Shared data types for the dials registry.
//!
//! This crate contains pure data types (dial type tags, values, declarations
//! and registration records). It has no registry logic and no I/O, so the
//! binding layers and tooling can depend on it without pulling in storage.

pub mod config;
pub mod dial;
pub mod registration;

// Re-export commonly used types at the crate root for convenience
pub use config::{
    BooleanConfig, ColorConfig, DialConfig, NumberConfig, SpacingConfig, VariantConfig,
};
pub use dial::{DialType, DialValue};
pub use registration::DialRegistration;
