//! Listener bookkeeping and notification ordering
//!
//! Per-dial listeners run synchronously, in subscription order, for every
//! change. Whole-registry listeners run on a deferred executor, and any
//! number of changes made before that task runs collapse into one call.

use arc_swap::ArcSwap;
use dials_types::DialValue;
use log::{error, trace, warn};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::scheduler::DeferredExecutor;

/// Called with the new value each time a dial changes
pub type DialListener = Arc<dyn Fn(&DialValue) + Send + Sync>;

/// Called once per coalesced batch of registry changes
pub type RegistryListener = Arc<dyn Fn() + Send + Sync>;

/// Longest chain of changes made from inside listeners.
///
/// A notification triggered by a listener is one level deeper than the one
/// that ran the listener. Chains that reach this depth are cut off instead
/// of spinning forever; any number of notifications at the same depth (a
/// listener calling `reset_all`, say) is fine. Whole-registry batches
/// scheduled from registry listeners are capped the same way.
pub const MAX_CASCADE: usize = 1024;

#[derive(Clone)]
struct Entry<L> {
    token: u64,
    listener: L,
}

type DialListeners = Arc<Vec<Entry<DialListener>>>;

/// Owns both listener sets and the pending-notification flag
pub struct SubscriptionManager {
    next_token: AtomicU64,
    /// Copy-on-write lists so a notification pass iterates a snapshot
    dial_listeners: Mutex<HashMap<String, DialListeners>>,
    registry_listeners: ArcSwap<Vec<Entry<RegistryListener>>>,
    /// True while a registry notification task is queued but has not run
    pending: AtomicBool,
    /// Cascade depth of the queued batch
    pending_depth: AtomicUsize,
    /// Depth of the batch whose listeners are running, or NOT_FIRING
    firing_depth: AtomicUsize,
    executor: Arc<dyn DeferredExecutor>,
}

const NOT_FIRING: usize = usize::MAX;

impl SubscriptionManager {
    pub fn new(executor: Arc<dyn DeferredExecutor>) -> Self {
        Self {
            next_token: AtomicU64::new(1),
            dial_listeners: Mutex::new(HashMap::new()),
            registry_listeners: ArcSwap::from_pointee(Vec::new()),
            pending: AtomicBool::new(false),
            pending_depth: AtomicUsize::new(0),
            firing_depth: AtomicUsize::new(NOT_FIRING),
            executor,
        }
    }

    fn token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }

    /// Listen for changes of one dial
    pub fn subscribe(self: &Arc<Self>, id: &str, listener: DialListener) -> Subscription {
        let token = self.token();
        {
            let mut map = self.dial_listeners.lock().unwrap_or_else(PoisonError::into_inner);
            let list = map.entry(id.to_string()).or_default();
            let mut updated = Vec::with_capacity(list.len() + 1);
            updated.extend(list.iter().cloned());
            updated.push(Entry { token, listener });
            *list = Arc::new(updated);
        }
        trace!("Subscribed listener {} to dial '{}'", token, id);

        Subscription {
            manager: Arc::downgrade(self),
            target: Target::Dial(id.to_string()),
            token,
        }
    }

    /// Listen for any registry change
    pub fn subscribe_to_registry(self: &Arc<Self>, listener: RegistryListener) -> Subscription {
        let token = self.token();
        let entry = Entry { token, listener };
        self.registry_listeners.rcu(|current| {
            let mut updated = Vec::with_capacity(current.len() + 1);
            updated.extend(current.iter().cloned());
            updated.push(entry.clone());
            updated
        });
        trace!("Subscribed registry listener {}", token);

        Subscription {
            manager: Arc::downgrade(self),
            target: Target::Registry,
            token,
        }
    }

    fn remove_dial_listener(&self, id: &str, token: u64) {
        let mut map = self.dial_listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = map.get_mut(id) else {
            return;
        };
        if !list.iter().any(|e| e.token == token) {
            return;
        }
        let remaining: Vec<_> = list.iter().filter(|e| e.token != token).cloned().collect();
        if remaining.is_empty() {
            map.remove(id);
        } else {
            *list = Arc::new(remaining);
        }
    }

    fn remove_registry_listener(&self, token: u64) {
        self.registry_listeners.rcu(|current| {
            current
                .iter()
                .filter(|e| e.token != token)
                .cloned()
                .collect::<Vec<_>>()
        });
    }

    /// Number of listeners on dial `id`
    pub fn listener_count(&self, id: &str) -> usize {
        self.dial_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map_or(0, |list| list.len())
    }

    pub fn registry_listener_count(&self) -> usize {
        self.registry_listeners.load().len()
    }

    /// Invoke the listeners of `id` with `value`.
    ///
    /// The listener set is captured now; listeners added or removed while
    /// the pass runs only affect later passes.
    pub fn notify_dial(&self, id: &str, value: DialValue) {
        let listeners = {
            let map = self.dial_listeners.lock().unwrap_or_else(PoisonError::into_inner);
            match map.get(id) {
                Some(list) => Arc::clone(list),
                None => return,
            }
        };

        dispatch(Box::new(move || {
            for entry in listeners.iter() {
                (entry.listener)(&value);
            }
        }));
    }

    /// Queue one registry notification unless one is already pending.
    ///
    /// A batch scheduled by a registry listener is one level deeper than the
    /// batch that ran it; at [`MAX_CASCADE`] levels it is dropped.
    pub fn schedule_registry_notification(self: &Arc<Self>) {
        if self.pending.swap(true, Ordering::AcqRel) {
            trace!("Registry notification already pending");
            return;
        }

        let depth = match self.firing_depth.load(Ordering::Acquire) {
            NOT_FIRING => 0,
            firing => firing + 1,
        };
        if depth >= MAX_CASCADE {
            error!(
                "Dropping registry notification after {} nested batches; a registry listener keeps changing dials",
                MAX_CASCADE
            );
            self.pending.store(false, Ordering::Release);
            return;
        }
        self.pending_depth.store(depth, Ordering::Release);

        let mut batch = ScheduledBatch {
            manager: Arc::downgrade(self),
        };
        self.executor.defer(Box::new(move || batch.run()));
    }

    /// True while a registry batch is queued but has not run
    pub fn has_pending_notification(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    fn fire_registry_listeners(&self) {
        let depth = self.pending_depth.load(Ordering::Acquire);
        // Cleared first so changes made by listeners schedule a fresh batch
        self.pending.store(false, Ordering::Release);

        let _firing = FiringGuard::enter(&self.firing_depth, depth);
        let listeners = self.registry_listeners.load_full();
        trace!("Notifying {} registry listeners (depth {})", listeners.len(), depth);
        for entry in listeners.iter() {
            (entry.listener)();
        }
    }

    /// Run the executor's queued work, if it is a host-drained one
    pub fn drain_executor(&self) -> usize {
        self.executor.drain()
    }
}

/// Deferred registry notification.
///
/// If the executor drops the task without running it (a runtime that has
/// shut down), the pending flag is released so later changes can schedule
/// again.
struct ScheduledBatch {
    manager: Weak<SubscriptionManager>,
}

impl ScheduledBatch {
    fn run(&mut self) {
        let manager = std::mem::take(&mut self.manager);
        if let Some(manager) = manager.upgrade() {
            manager.fire_registry_listeners();
        }
    }
}

impl Drop for ScheduledBatch {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            warn!("Registry notification was dropped by its executor");
            manager.pending.store(false, Ordering::Release);
        }
    }
}

/// Marks a registry batch as running; restored even if a listener panics
struct FiringGuard<'a> {
    slot: &'a AtomicUsize,
    previous: usize,
}

impl<'a> FiringGuard<'a> {
    fn enter(slot: &'a AtomicUsize, depth: usize) -> Self {
        let previous = slot.swap(depth, Ordering::AcqRel);
        Self { slot, previous }
    }
}

impl Drop for FiringGuard<'_> {
    fn drop(&mut self) {
        self.slot.store(self.previous, Ordering::Release);
    }
}

enum Target {
    Dial(String),
    Registry,
}

/// Handle that removes exactly one listener.
///
/// Dropping the handle leaves the listener registered.
#[must_use = "keep the Subscription to be able to unsubscribe the listener"]
pub struct Subscription {
    manager: Weak<SubscriptionManager>,
    target: Target,
    token: u64,
}

impl Subscription {
    /// Remove the listener. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        match &self.target {
            Target::Dial(id) => manager.remove_dial_listener(id, self.token),
            Target::Registry => manager.remove_registry_listener(self.token),
        }
    }
}

type Job = Box<dyn FnOnce()>;

#[derive(Default)]
struct DispatchQueue {
    draining: bool,
    /// Cascade depth of the job currently running
    depth: usize,
    jobs: VecDeque<(usize, Job)>,
}

thread_local! {
    static DISPATCH: RefCell<DispatchQueue> = RefCell::new(DispatchQueue::default());
}

/// Resets the thread's queue even if a listener panics
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        DISPATCH.with(|queue| {
            let mut queue = queue.borrow_mut();
            queue.draining = false;
            queue.depth = 0;
            queue.jobs.clear();
        });
    }
}

/// Run `job` now, or after the current job if this thread is already
/// dispatching (a listener changed a dial from inside its callback).
fn dispatch(job: Job) {
    let drain_here = DISPATCH.with(|queue| {
        let mut queue = queue.borrow_mut();
        if !queue.draining {
            queue.draining = true;
            queue.jobs.push_back((0, job));
            return true;
        }

        let depth = queue.depth + 1;
        if depth >= MAX_CASCADE {
            error!(
                "Dropping dial notification after {} nested changes; a listener keeps changing dials",
                MAX_CASCADE
            );
        } else {
            queue.jobs.push_back((depth, job));
        }
        false
    });
    if !drain_here {
        return;
    }

    let _guard = DrainGuard;
    loop {
        let next = DISPATCH.with(|queue| {
            let mut queue = queue.borrow_mut();
            let (depth, job) = queue.jobs.pop_front()?;
            queue.depth = depth;
            Some(job)
        });
        match next {
            Some(job) => job(),
            None => break,
        }
    }
}
