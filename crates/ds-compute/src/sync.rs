//! In-process engine: tasks run inside `queue_task`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ds_core::{ComputeEngine, TaskHandle, TaskPayload};

use crate::runner::{DistributionRunner, TaskRunner, run_logged};

/// Runs every task on the submitting thread; the returned handle is
/// already resolved. Priority is irrelevant.
pub struct SynchronousEngine {
    runner: Arc<dyn TaskRunner>,
    terminated: AtomicBool,
}

impl SynchronousEngine {
    /// Engine using the default [`DistributionRunner`].
    pub fn new() -> Self {
        Self::with_runner(Arc::new(DistributionRunner::default()))
    }

    /// Engine using a custom runner.
    pub fn with_runner(runner: Arc<dyn TaskRunner>) -> Self {
        Self { runner, terminated: AtomicBool::new(false) }
    }
}

impl Default for SynchronousEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeEngine for SynchronousEngine {
    fn queue_task(&self, payload: TaskPayload, _priority: i32) -> TaskHandle {
        if self.terminated.load(Ordering::Acquire) {
            return TaskHandle::terminated();
        }
        let cancel = AtomicBool::new(false);
        TaskHandle::ready(run_logged(self.runner.as_ref(), payload, &cancel, self.name()))
    }

    fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
    }

    fn name(&self) -> &str {
        "sync"
    }
}
