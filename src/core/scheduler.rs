//! Deferred execution for whole-registry notifications
//!
//! Registry listeners never run inside the call that changed a dial. The
//! registry hands a task to a [`DeferredExecutor`], which runs it once the
//! caller's stack has unwound: when the host drains a [`ManualExecutor`]
//! at its event-loop turn, or on a tokio runtime with [`TokioExecutor`].

use log::trace;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Unit of deferred work
pub type DeferredTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks "soon", never on the calling stack
pub trait DeferredExecutor: Send + Sync {
    fn defer(&self, task: DeferredTask);

    /// Run whatever is queued now, returning the number of tasks run.
    ///
    /// Executors that drive themselves return 0.
    fn drain(&self) -> usize {
        0
    }
}

/// Queue drained explicitly by the host
#[derive(Default)]
pub struct ManualExecutor {
    queue: Mutex<VecDeque<DeferredTask>>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Run the tasks queued so far.
    ///
    /// Tasks deferred while this runs wait for the next call, so work that
    /// keeps rescheduling itself advances one batch per call.
    pub fn run_pending(&self) -> usize {
        let batch = std::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner));
        let ran = batch.len();
        for task in batch {
            task();
        }
        if ran > 0 {
            trace!("Ran {} deferred tasks", ran);
        }
        ran
    }
}

impl DeferredExecutor for ManualExecutor {
    fn defer(&self, task: DeferredTask) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
    }

    fn drain(&self) -> usize {
        self.run_pending()
    }
}

/// Spawns deferred tasks onto a tokio runtime
#[derive(Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Executor on the runtime of the current context, if there is one
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl DeferredExecutor for TokioExecutor {
    /// A runtime that has shut down drops the task without running it.
    fn defer(&self, task: DeferredTask) {
        self.handle.spawn(async move {
            task();
        });
    }
}
