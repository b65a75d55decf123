//! Process-wide registry slots
//!
//! One registry per scope for the life of the process. Code that runs again
//! without a restart (a reloaded module, a re-mounted UI) gets the instance
//! it had before instead of a fresh one with its overrides reloaded.

use log::{info, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use super::registry::DialRegistry;
use crate::config::RegistrySettings;
use crate::error::RegistryError;
use crate::storage::DEFAULT_PROJECT;

enum Slot {
    /// `init` is running on this thread
    Constructing(ThreadId),
    Ready(DialRegistry),
}

struct Slots {
    map: Mutex<HashMap<String, Slot>>,
    ready: Condvar,
}

impl Slots {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

static GLOBAL_REGISTRIES: Lazy<Slots> = Lazy::new(|| Slots {
    map: Mutex::new(HashMap::new()),
    ready: Condvar::new(),
});

/// Clears a Constructing slot if `init` panics, so waiters are not stuck
struct ConstructionGuard<'a> {
    scope: &'a str,
    armed: bool,
}

impl Drop for ConstructionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            GLOBAL_REGISTRIES.lock().remove(self.scope);
            GLOBAL_REGISTRIES.ready.notify_all();
        }
    }
}

/// Get the registry for `scope`, creating it with `init` on first use.
///
/// `init` runs without the slot lock held. Other threads asking for the same
/// scope wait for it; a call for the same scope from inside `init` fails
/// with [`RegistryError::Reentrant`].
pub fn global_registry_with<F>(scope: &str, init: F) -> Result<DialRegistry, RegistryError>
where
    F: FnOnce() -> DialRegistry,
{
    let me = thread::current().id();
    let mut slots = GLOBAL_REGISTRIES.lock();
    loop {
        let constructing_here = match slots.get(scope) {
            Some(Slot::Ready(registry)) => return Ok(registry.clone()),
            Some(Slot::Constructing(owner)) => *owner == me,
            None => break,
        };
        if constructing_here {
            return Err(RegistryError::Reentrant(scope.to_string()));
        }
        slots = GLOBAL_REGISTRIES
            .ready
            .wait(slots)
            .unwrap_or_else(PoisonError::into_inner);
    }
    slots.insert(scope.to_string(), Slot::Constructing(me));
    drop(slots);

    let mut guard = ConstructionGuard { scope, armed: true };
    let registry = init();

    GLOBAL_REGISTRIES
        .lock()
        .insert(scope.to_string(), Slot::Ready(registry.clone()));
    guard.armed = false;
    GLOBAL_REGISTRIES.ready.notify_all();

    info!("Initialized global dial registry '{}'", scope);
    Ok(registry)
}

/// Registry for the default scope, configured from the settings file
pub fn global_registry() -> Result<DialRegistry, RegistryError> {
    global_registry_with(DEFAULT_PROJECT, || RegistrySettings::load().build_registry())
}

/// Registry for a project scope, configured from the settings file
pub fn global_registry_for(project_id: &str) -> Result<DialRegistry, RegistryError> {
    global_registry_with(project_id, || {
        RegistrySettings::load()
            .with_project_id(project_id)
            .build_registry()
    })
}

/// Install a pre-built registry for `scope`.
///
/// Returns false and keeps the existing instance if the scope is taken.
pub fn install_global_registry(scope: &str, registry: DialRegistry) -> bool {
    let mut slots = GLOBAL_REGISTRIES.lock();
    if slots.contains_key(scope) {
        warn!("Global dial registry '{}' already initialized", scope);
        return false;
    }
    slots.insert(scope.to_string(), Slot::Ready(registry));
    drop(slots);
    GLOBAL_REGISTRIES.ready.notify_all();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use dials_types::{DialValue, VariantConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_get_or_create_returns_same_instance() {
        let builds = AtomicUsize::new(0);
        let make = || {
            builds.fetch_add(1, Ordering::SeqCst);
            DialRegistry::new()
        };

        let first = global_registry_with("test-same-instance", make).unwrap();
        for _ in 0..10 {
            let again = global_registry_with("test-same-instance", || {
                builds.fetch_add(1, Ordering::SeqCst);
                DialRegistry::new()
            })
            .unwrap();
            assert!(again.ptr_eq(&first));
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_state_survives_repeated_lookup() {
        let store = MemoryStore::new();
        let registry = global_registry_with("test-survives", || {
            DialRegistry::builder().store(store.clone()).build()
        })
        .unwrap();
        registry
            .register_variant("theme", VariantConfig::new("Theme", "dark", ["dark", "light"]))
            .unwrap();
        registry.set_value("theme", "light").unwrap();

        // A reloaded module asks again and sees the live value
        let reloaded = global_registry_with("test-survives", DialRegistry::new).unwrap();
        assert_eq!(reloaded.get_value("theme"), Some(DialValue::from("light")));
    }

    #[test]
    fn test_reentrant_construction_fails() {
        let result = global_registry_with("test-reentrant", || {
            let nested = global_registry_with("test-reentrant", DialRegistry::new);
            assert!(matches!(nested, Err(RegistryError::Reentrant(_))));
            DialRegistry::new()
        });
        assert!(result.is_ok());
    }

    #[test]
    fn test_panicking_init_frees_the_slot() {
        let outcome = std::panic::catch_unwind(|| {
            let _ = global_registry_with("test-panic", || panic!("init failed"));
        });
        assert!(outcome.is_err());
        assert!(global_registry_with("test-panic", DialRegistry::new).is_ok());
    }

    #[test]
    fn test_concurrent_callers_share_one_instance() {
        let builds = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let builds = builds.clone();
                std::thread::spawn(move || {
                    global_registry_with("test-concurrent", || {
                        builds.fetch_add(1, Ordering::SeqCst);
                        DialRegistry::new()
                    })
                    .unwrap()
                })
            })
            .collect();

        let registries: Vec<DialRegistry> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(registries.iter().all(|r| r.ptr_eq(&registries[0])));
    }

    #[test]
    fn test_install_keeps_first_instance() {
        let installed = DialRegistry::new();
        assert!(install_global_registry("test-install", installed.clone()));
        assert!(!install_global_registry("test-install", DialRegistry::new()));

        let fetched = global_registry_with("test-install", DialRegistry::new).unwrap();
        assert!(fetched.ptr_eq(&installed));
    }
}
