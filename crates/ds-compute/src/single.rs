//! One OS thread per task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use ds_core::{ComputeEngine, Error, TaskHandle, TaskPayload, TaskResolver};

use crate::runner::{DistributionRunner, TaskRunner, run_logged};

/// Spawns a dedicated thread for every task; the thread exits when its task
/// completes. Tasks run concurrently, so priority is ignored.
pub struct SingleWorkerEngine {
    runner: Arc<dyn TaskRunner>,
    state: Arc<Mutex<InFlight>>,
}

struct Running {
    resolver: TaskResolver,
    cancel: Arc<AtomicBool>,
}

#[derive(Default)]
struct InFlight {
    terminated: bool,
    next_id: u64,
    tasks: HashMap<u64, Running>,
}

impl SingleWorkerEngine {
    /// Engine using the default [`DistributionRunner`].
    pub fn new() -> Self {
        Self::with_runner(Arc::new(DistributionRunner::default()))
    }

    /// Engine using a custom runner.
    pub fn with_runner(runner: Arc<dyn TaskRunner>) -> Self {
        Self { runner, state: Arc::new(Mutex::new(InFlight::default())) }
    }

    /// Tasks currently running.
    pub fn in_flight(&self) -> usize {
        self.state.lock().expect("single worker state mutex poisoned").tasks.len()
    }
}

impl Default for SingleWorkerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeEngine for SingleWorkerEngine {
    fn queue_task(&self, payload: TaskPayload, _priority: i32) -> TaskHandle {
        let (resolver, handle) = TaskHandle::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        let id = {
            let mut state = self.state.lock().expect("single worker state mutex poisoned");
            if state.terminated {
                resolver.terminate();
                return handle;
            }
            let id = state.next_id;
            state.next_id += 1;
            state.tasks.insert(id, Running { resolver, cancel: Arc::clone(&cancel) });
            id
        };

        let runner = Arc::clone(&self.runner);
        let state = Arc::clone(&self.state);
        let label = payload.label();
        let spawned = thread::Builder::new().name(format!("ds-task-{id}")).spawn(move || {
            let outcome = run_logged(runner.as_ref(), payload, &cancel, "single");
            let running = state.lock().expect("single worker state mutex poisoned").tasks.remove(&id);
            // absent once terminate() has already rejected it
            if let Some(running) = running {
                running.resolver.resolve(outcome);
            }
        });

        if let Err(e) = spawned {
            tracing::error!(task = %label, error = %e, "failed to spawn task thread");
            let running = self.state.lock().expect("single worker state mutex poisoned").tasks.remove(&id);
            if let Some(running) = running {
                running.resolver.resolve(Err(Error::Computation(format!("thread spawn failed: {e}"))));
            }
        } else {
            tracing::debug!(task = %label, id, "task thread started");
        }
        handle
    }

    fn terminate(&self) {
        let mut state = self.state.lock().expect("single worker state mutex poisoned");
        state.terminated = true;
        let n = state.tasks.len();
        for (_, running) in state.tasks.drain() {
            running.cancel.store(true, Ordering::Relaxed);
            running.resolver.terminate();
        }
        tracing::info!(engine = "single", rejected = n, "engine terminated");
    }

    fn name(&self) -> &str {
        "single"
    }
}
