//! Dial registry core: registration, values, notifications

mod global;
mod registry;
mod scheduler;
mod subscriptions;
mod validation;

pub use global::{global_registry, global_registry_for, global_registry_with, install_global_registry};
pub use registry::{DialRegistry, RegistryBuilder, UNGROUPED};
pub use scheduler::{DeferredExecutor, DeferredTask, ManualExecutor, TokioExecutor};
pub use subscriptions::{DialListener, RegistryListener, Subscription, MAX_CASCADE};
pub use validation::{validate_config, validate_value};
