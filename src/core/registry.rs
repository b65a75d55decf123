//! Dial registry
//!
//! Single source of truth for which dials exist and what their current
//! values are. Call sites declare dials with [`DialRegistry::register`]
//! (get-or-create), tooling and controls change them with
//! [`DialRegistry::set_value`], and subscribers hear about it.

use chrono::Utc;
use dials_types::{
    BooleanConfig, ColorConfig, DialConfig, DialRegistration, DialType, DialValue, NumberConfig,
    SpacingConfig, VariantConfig,
};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::scheduler::{DeferredExecutor, ManualExecutor};
use super::subscriptions::{Subscription, SubscriptionManager};
use super::validation::{validate_config, validate_value};
use crate::error::DialError;
use crate::storage::{KeyValueStore, SharedStore, StorageAdapter, DEFAULT_NAMESPACE};

/// Group name used for dials declared without one
pub const UNGROUPED: &str = "Other";

struct RegistryState {
    dials: HashMap<String, DialRegistration>,
    storage: StorageAdapter,
}

impl RegistryState {
    /// Value for a dial registered for the first time: a valid stored
    /// override, else the declared default
    fn resolve_initial(&mut self, id: &str, config: &DialConfig) -> DialValue {
        match self.storage.get_persisted_value(id, config.dial_type()) {
            Some(value) => match validate_value(id, config, &value) {
                Ok(()) => value,
                Err(e) => {
                    warn!("Discarding stored override: {}", e);
                    self.storage.remove_value(id);
                    config.default_value()
                }
            },
            None => config.default_value(),
        }
    }
}

struct RegistryInner {
    state: Mutex<RegistryState>,
    subscriptions: Arc<SubscriptionManager>,
}

/// Handle to a dial registry.
///
/// Cloning is cheap and every clone refers to the same registry. The state
/// lock is never held while listeners run, so listeners may call back into
/// the registry.
#[derive(Clone)]
pub struct DialRegistry {
    inner: Arc<RegistryInner>,
}

/// Builder for [`DialRegistry`]
pub struct RegistryBuilder {
    namespace: String,
    project_id: Option<String>,
    store: Option<SharedStore>,
    executor: Option<Arc<dyn DeferredExecutor>>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            project_id: None,
            store: None,
            executor: None,
        }
    }
}

impl RegistryBuilder {
    /// Prefix of every storage key (default: `dials`)
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Persistence scope; dials of different projects never alias
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Persist overrides in `store`
    pub fn store(self, store: impl KeyValueStore + 'static) -> Self {
        self.shared_store(Arc::new(store))
    }

    /// Persist overrides in a store shared with other registries
    pub fn shared_store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Set or clear the store; `None` keeps overrides in memory only
    pub fn maybe_store(mut self, store: Option<SharedStore>) -> Self {
        self.store = store;
        self
    }

    /// Executor for whole-registry notifications (default: [`ManualExecutor`])
    pub fn executor(mut self, executor: Arc<dyn DeferredExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Create the registry and load the scope's stored overrides
    pub fn build(self) -> DialRegistry {
        let mut storage =
            StorageAdapter::new(self.store, &self.namespace, self.project_id.as_deref());
        storage.load_from_storage();

        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(ManualExecutor::new()));

        info!(
            "Created dial registry (namespace: {}, project: {})",
            self.namespace,
            self.project_id.as_deref().unwrap_or("default")
        );

        DialRegistry {
            inner: Arc::new(RegistryInner {
                state: Mutex::new(RegistryState {
                    dials: HashMap::new(),
                    storage,
                }),
                subscriptions: Arc::new(SubscriptionManager::new(executor)),
            }),
        }
    }
}

impl DialRegistry {
    /// Start configuring a registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry without persistence
    pub fn new() -> Self {
        Self::builder().build()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True if both handles refer to the same registry
    pub fn ptr_eq(&self, other: &DialRegistry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Project scope, `None` for the default scope
    pub fn project_id(&self) -> Option<String> {
        self.state().storage.project_id().map(str::to_string)
    }

    /// True if overrides are written to a host store
    pub fn is_persistent(&self) -> bool {
        self.state().storage.is_available()
    }

    /// Number of registered dials
    pub fn len(&self) -> usize {
        self.state().dials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `id` has been registered
    pub fn contains(&self, id: &str) -> bool {
        self.state().dials.contains_key(id)
    }

    /// Declare a dial and return its current value.
    ///
    /// The first call creates the registration, resolving the value from a
    /// stored override or the config default. Later calls with the same type
    /// replace the stored config but keep the current value, so labels and
    /// options can change without losing a user's override.
    pub fn register(
        &self,
        id: &str,
        dial_type: DialType,
        config: DialConfig,
    ) -> Result<DialValue, DialError> {
        validate_config(id, dial_type, &config)?;

        let value = {
            let mut state = self.state();

            if let Some(existing) = state.dials.get_mut(id) {
                if existing.dial_type != dial_type {
                    return Err(DialError::DuplicateTypeMismatch {
                        id: id.to_string(),
                        existing: existing.dial_type,
                        requested: dial_type,
                    });
                }
                if existing.config != config {
                    debug!("Refreshed config of dial '{}'", id);
                    if let Err(e) = validate_value(id, &config, &existing.current_value) {
                        warn!("Kept current value after config change: {}", e);
                    }
                    existing.config = config;
                }
                return Ok(existing.current_value.clone());
            }

            let value = state.resolve_initial(id, &config);
            state
                .dials
                .insert(id.to_string(), DialRegistration::new(id, config, value.clone()));
            value
        };

        debug!("Registered {} dial '{}' = {}", dial_type, id, value);
        self.inner.subscriptions.schedule_registry_notification();
        Ok(value)
    }

    /// Register a color dial and return its current value
    pub fn register_color(&self, id: &str, config: ColorConfig) -> Result<String, DialError> {
        let value = self.register(id, DialType::Color, config.into())?;
        into_text(id, DialType::Color, value)
    }

    /// Register a spacing dial and return its current value
    pub fn register_spacing(&self, id: &str, config: SpacingConfig) -> Result<String, DialError> {
        let value = self.register(id, DialType::Spacing, config.into())?;
        into_text(id, DialType::Spacing, value)
    }

    /// Register a variant dial and return the selected option
    pub fn register_variant(&self, id: &str, config: VariantConfig) -> Result<String, DialError> {
        let value = self.register(id, DialType::Variant, config.into())?;
        into_text(id, DialType::Variant, value)
    }

    /// Register a boolean dial and return its current value
    pub fn register_boolean(&self, id: &str, config: BooleanConfig) -> Result<bool, DialError> {
        match self.register(id, DialType::Boolean, config.into())? {
            DialValue::Bool(b) => Ok(b),
            other => Err(mismatch(id, DialType::Boolean, &other)),
        }
    }

    /// Register a number dial and return its current value
    pub fn register_number(&self, id: &str, config: NumberConfig) -> Result<f64, DialError> {
        match self.register(id, DialType::Number, config.into())? {
            DialValue::Number(n) => Ok(n),
            other => Err(mismatch(id, DialType::Number, &other)),
        }
    }

    /// Change a dial's value.
    ///
    /// On success the value is persisted, the dial's listeners have run by
    /// the time this returns, and a registry notification is scheduled. On
    /// failure nothing changes.
    pub fn set_value(&self, id: &str, value: impl Into<DialValue>) -> Result<(), DialError> {
        let value = value.into();
        {
            let mut state = self.state();
            let RegistryState { dials, storage } = &mut *state;

            let dial = dials
                .get_mut(id)
                .ok_or_else(|| DialError::UnknownDial(id.to_string()))?;
            validate_value(id, &dial.config, &value)?;

            dial.current_value = value.clone();
            dial.updated_at = Some(Utc::now());
            storage.persist_value(id, dial.dial_type, &value);
        }

        debug!("Set dial '{}' = {}", id, value);
        self.notify_change(id, value);
        Ok(())
    }

    /// Restore a dial's default and drop its stored override.
    ///
    /// Returns false, without doing anything, if `id` is not registered.
    pub fn reset(&self, id: &str) -> bool {
        let value = {
            let mut state = self.state();
            let RegistryState { dials, storage } = &mut *state;

            let Some(dial) = dials.get_mut(id) else {
                debug!("Ignoring reset of unknown dial '{}'", id);
                return false;
            };
            dial.current_value = dial.config.default_value();
            dial.updated_at = Some(Utc::now());
            storage.remove_value(id);
            dial.current_value.clone()
        };

        debug!("Reset dial '{}' = {}", id, value);
        self.notify_change(id, value);
        true
    }

    /// Reset every registered dial as one batch: each dial's listeners run
    /// once, registry listeners once for the whole batch
    pub fn reset_all(&self) {
        let mut changed = {
            let mut state = self.state();
            let RegistryState { dials, storage } = &mut *state;
            let now = Utc::now();

            let mut changed = Vec::with_capacity(dials.len());
            for (id, dial) in dials.iter_mut() {
                dial.current_value = dial.config.default_value();
                dial.updated_at = Some(now);
                storage.remove_value(id);
                changed.push((id.clone(), dial.current_value.clone()));
            }
            changed
        };
        if changed.is_empty() {
            return;
        }

        info!("Reset {} dials to their defaults", changed.len());
        changed.sort_by(|a, b| a.0.cmp(&b.0));
        for (id, value) in changed {
            self.inner.subscriptions.notify_dial(&id, value);
        }
        self.inner.subscriptions.schedule_registry_notification();
    }

    fn notify_change(&self, id: &str, value: DialValue) {
        self.inner.subscriptions.notify_dial(id, value);
        self.inner.subscriptions.schedule_registry_notification();
    }

    /// Current value of `id`, if registered
    pub fn get_value(&self, id: &str) -> Option<DialValue> {
        self.state().dials.get(id).map(|d| d.current_value.clone())
    }

    /// Snapshot of the registration for `id`
    pub fn get_dial(&self, id: &str) -> Option<DialRegistration> {
        self.state().dials.get(id).cloned()
    }

    /// All registrations, sorted by id
    pub fn get_all_dials(&self) -> Vec<DialRegistration> {
        let mut dials: Vec<DialRegistration> = self.state().dials.values().cloned().collect();
        dials.sort_by(|a, b| a.id.cmp(&b.id));
        dials
    }

    /// Registrations keyed by `config.group` ([`UNGROUPED`] when absent),
    /// groups ordered by name and members by id
    pub fn get_dials_by_group(&self) -> BTreeMap<String, Vec<DialRegistration>> {
        let mut groups: BTreeMap<String, Vec<DialRegistration>> = BTreeMap::new();
        for dial in self.get_all_dials() {
            let group = dial.group().unwrap_or(UNGROUPED).to_string();
            groups.entry(group).or_default().push(dial);
        }
        groups
    }

    /// Current value of every dial, keyed by id
    pub fn export_values(&self) -> BTreeMap<String, DialValue> {
        self.state()
            .dials
            .iter()
            .map(|(id, dial)| (id.clone(), dial.current_value.clone()))
            .collect()
    }

    /// Every registration, sorted by id, for tooling snapshots
    pub fn export_dials(&self) -> Vec<DialRegistration> {
        self.get_all_dials()
    }

    /// Current values as a JSON object, for copying a configuration out
    pub fn export_json(&self) -> serde_json::Value {
        let object = self
            .export_values()
            .into_iter()
            .map(|(id, value)| (id, value_to_json(value)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(object)
    }

    /// Erase this scope's stored overrides.
    ///
    /// Current values are untouched; the effect shows on the next start or
    /// after [`DialRegistry::reset_all`].
    pub fn clear_storage(&self) {
        self.state().storage.clear();
    }

    /// Ids that currently have a stored override, sorted
    pub fn persisted_ids(&self) -> Vec<String> {
        self.state().storage.persisted_ids()
    }

    /// Call `listener` with the new value each time dial `id` changes
    pub fn subscribe<F>(&self, id: &str, listener: F) -> Subscription
    where
        F: Fn(&DialValue) + Send + Sync + 'static,
    {
        self.inner.subscriptions.subscribe(id, Arc::new(listener))
    }

    /// Call `listener` after any batch of value changes, resets or new
    /// registrations
    pub fn subscribe_to_registry<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.subscriptions.subscribe_to_registry(Arc::new(listener))
    }

    /// Number of listeners subscribed to dial `id`
    pub fn listener_count(&self, id: &str) -> usize {
        self.inner.subscriptions.listener_count(id)
    }

    /// True while a registry notification is scheduled but has not run
    pub fn has_pending_notification(&self) -> bool {
        self.inner.subscriptions.has_pending_notification()
    }

    /// Run deferred notifications now. Hosts using the default
    /// [`ManualExecutor`] call this once per event-loop turn.
    pub fn flush_notifications(&self) -> usize {
        self.inner.subscriptions.drain_executor()
    }
}

impl Default for DialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn mismatch(id: &str, expected: DialType, value: &DialValue) -> DialError {
    DialError::TypeMismatch {
        id: id.to_string(),
        expected,
        found: value.kind(),
    }
}

fn into_text(id: &str, expected: DialType, value: DialValue) -> Result<String, DialError> {
    match value {
        DialValue::Text(text) => Ok(text),
        other => Err(mismatch(id, expected, &other)),
    }
}

fn value_to_json(value: DialValue) -> serde_json::Value {
    match value {
        DialValue::Bool(b) => serde_json::Value::Bool(b),
        DialValue::Number(n) => serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        DialValue::Text(s) => serde_json::Value::String(s),
    }
}
