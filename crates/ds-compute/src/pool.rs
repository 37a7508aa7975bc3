//! Fixed-size worker pool with a priority scheduler.
//!
//! The queue and every worker's busy/idle state are owned by one scheduler
//! thread, fed by a single control channel:
//!
//! 1. `queue_task` sends `Submit`; the job goes to an idle worker or into
//!    the [`PendingQueue`].
//! 2. A worker sends zero or more `Info` messages, then `Finished`.
//! 3. On `Finished` the worker is handed the next queued job *before* the
//!    finished caller is resolved, so it never idles while work is queued.
//! 4. `Terminate` rejects everything and closes the worker channels.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use ds_core::{ComputeEngine, Error, Result, TaskHandle, TaskOutput, TaskPayload, TaskResolver};

use crate::queue::PendingQueue;
use crate::runner::{DistributionRunner, ProfilingLevel, TaskContext, TaskRunner, run_guarded};

/// Default number of pool workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Worker threads (at least 1).
    pub workers: usize,
    /// Profiling level of the default runner.
    pub profiling: ProfilingLevel,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { workers: DEFAULT_WORKERS, profiling: ProfilingLevel::None }
    }
}

struct Job {
    payload: TaskPayload,
    priority: i32,
    resolver: TaskResolver,
}

enum Control {
    Submit(Job),
    Info { worker: usize, message: String },
    Finished { worker: usize, outcome: Result<TaskOutput> },
    Terminate,
}

/// Persistent pool of worker threads.
pub struct WorkerPool {
    control: Sender<Control>,
    workers: usize,
}

impl WorkerPool {
    /// Pool running the default [`DistributionRunner`].
    pub fn new(config: PoolConfig) -> Result<Self> {
        Self::with_runner(config, Arc::new(DistributionRunner::new(config.profiling)))
    }

    /// Pool running a custom runner.
    pub fn with_runner(config: PoolConfig, runner: Arc<dyn TaskRunner>) -> Result<Self> {
        if config.workers == 0 {
            return Err(Error::validation("worker pool needs at least one worker"));
        }
        let (control, rx) = mpsc::channel();

        let mut slots = Vec::with_capacity(config.workers);
        for worker in 0..config.workers {
            slots.push(Slot::spawn(worker, Arc::clone(&runner), control.clone())?);
        }

        let scheduler = Scheduler {
            rx,
            idle: (0..config.workers).rev().collect(),
            slots,
            queue: PendingQueue::new(),
            terminated: false,
        };
        thread::Builder::new()
            .name("ds-scheduler".into())
            .spawn(move || scheduler.run())
            .map_err(|e| Error::Computation(format!("failed to spawn scheduler: {e}")))?;

        tracing::info!(workers = config.workers, profiling = %config.profiling, "worker pool started");
        Ok(Self { control, workers: config.workers })
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl ComputeEngine for WorkerPool {
    fn queue_task(&self, payload: TaskPayload, priority: i32) -> TaskHandle {
        let (resolver, handle) = TaskHandle::channel();
        // a stopped scheduler drops the job, which rejects the handle
        let _ = self.control.send(Control::Submit(Job { payload, priority, resolver }));
        handle
    }

    fn terminate(&self) {
        let _ = self.control.send(Control::Terminate);
    }

    fn name(&self) -> &str {
        "pool"
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Scheduler-side view of one worker.
struct Slot {
    jobs: Option<Sender<TaskPayload>>,
    cancel: Arc<AtomicBool>,
    busy: Option<(String, TaskResolver)>,
    handle: Option<JoinHandle<()>>,
}

impl Slot {
    fn spawn(worker: usize, runner: Arc<dyn TaskRunner>, control: Sender<Control>) -> Result<Self> {
        let (jobs, rx) = mpsc::channel::<TaskPayload>();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let handle = thread::Builder::new()
            .name(format!("ds-worker-{worker}"))
            .spawn(move || worker_loop(worker, runner.as_ref(), &rx, &flag, &control))
            .map_err(|e| Error::Computation(format!("failed to spawn worker {worker}: {e}")))?;
        Ok(Self { jobs: Some(jobs), cancel, busy: None, handle: Some(handle) })
    }
}

fn worker_loop(
    worker: usize,
    runner: &dyn TaskRunner,
    jobs: &Receiver<TaskPayload>,
    cancel: &AtomicBool,
    control: &Sender<Control>,
) {
    while let Ok(payload) = jobs.recv() {
        let mut sink = |message: String| {
            let _ = control.send(Control::Info { worker, message });
        };
        let outcome = run_guarded(runner, payload, &mut TaskContext::new(cancel, &mut sink));
        if control.send(Control::Finished { worker, outcome }).is_err() {
            break;
        }
    }
    tracing::debug!(worker, "worker exiting");
}

fn reject_unavailable(job: Job) {
    job.resolver.resolve(Err(Error::Computation("no live workers in pool".into())));
}

struct Scheduler {
    rx: Receiver<Control>,
    slots: Vec<Slot>,
    idle: Vec<usize>,
    queue: PendingQueue<Job>,
    terminated: bool,
}

impl Scheduler {
    fn run(mut self) {
        // ends once the pool handle and every worker have hung up
        while let Ok(msg) = self.rx.recv() {
            match msg {
                Control::Submit(job) => self.submit(job),
                Control::Info { worker, message } => {
                    let task = self.slots[worker].busy.as_ref().map_or("", |(label, _)| label.as_str());
                    tracing::info!(target: "ds_compute", engine = "pool", worker, task, "{message}");
                }
                Control::Finished { worker, outcome } => self.finished(worker, outcome),
                Control::Terminate => self.terminate(),
            }
        }
        self.join_workers();
    }

    fn submit(&mut self, job: Job) {
        if self.terminated {
            job.resolver.terminate();
            return;
        }
        match self.idle.pop() {
            Some(worker) => self.dispatch(worker, job),
            None if self.live_workers() == 0 => reject_unavailable(job),
            None => {
                tracing::debug!(priority = job.priority, queued = self.queue.len() + 1, "task queued");
                self.queue.push(job.priority, job);
            }
        }
    }

    fn live_workers(&self) -> usize {
        self.slots.iter().filter(|slot| slot.jobs.is_some()).count()
    }

    fn dispatch(&mut self, worker: usize, job: Job) {
        let Job { payload, priority, resolver } = job;
        let label = payload.label();
        tracing::debug!(worker, task = %label, priority, "dispatch");

        let slot = &mut self.slots[worker];
        let Some(jobs) = slot.jobs.as_ref() else {
            self.submit(Job { payload, priority, resolver });
            return;
        };
        match jobs.send(payload) {
            Ok(()) => slot.busy = Some((label, resolver)),
            Err(mpsc::SendError(payload)) => {
                // the worker thread is gone; never hand it work again
                tracing::error!(worker, task = %label, "worker unavailable");
                slot.jobs = None;
                self.idle.retain(|&w| w != worker);
                if self.live_workers() == 0 {
                    let queued = self.queue.len();
                    for job in self.queue.drain() {
                        reject_unavailable(job);
                    }
                    tracing::error!(queued, "no live workers left");
                }
                self.submit(Job { payload, priority, resolver });
            }
        }
    }

    fn finished(&mut self, worker: usize, outcome: Result<TaskOutput>) {
        let Some((label, resolver)) = self.slots[worker].busy.take() else {
            // already rejected by terminate
            return;
        };
        match self.queue.pop() {
            Some(next) => self.dispatch(worker, next),
            None => self.idle.push(worker),
        }
        if let Err(e) = &outcome {
            tracing::warn!(worker, task = %label, error = %e, "task failed");
        }
        resolver.resolve(outcome);
    }

    fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        let queued = self.queue.len();
        for job in self.queue.drain() {
            job.resolver.terminate();
        }
        let mut busy = 0;
        for slot in &mut self.slots {
            slot.cancel.store(true, Ordering::Relaxed);
            slot.jobs = None;
            if let Some((_, resolver)) = slot.busy.take() {
                resolver.terminate();
                busy += 1;
            }
        }
        self.idle.clear();
        tracing::info!(engine = "pool", queued, busy, "worker pool terminated");
    }

    fn join_workers(&mut self) {
        for slot in &mut self.slots {
            slot.jobs = None;
            if let Some(handle) = slot.handle.take() {
                let _ = handle.join();
            }
        }
    }
}
