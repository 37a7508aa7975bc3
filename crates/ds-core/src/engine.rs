//! Engine contract
//!
//! A `ComputeEngine` accepts named tasks and returns a [`TaskHandle`], a
//! future that resolves once the task has run somewhere (in-process, on a
//! dedicated thread, or on a pooled worker). Submission never blocks on
//! the computation itself.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::{Error, Result, TaskOutput, TaskPayload};

/// Executes distribution tasks off the caller's path.
pub trait ComputeEngine: Send + Sync {
    /// Submit a task. Higher `priority` is dispatched first; equal
    /// priorities run in submission order.
    fn queue_task(&self, payload: TaskPayload, priority: i32) -> TaskHandle;

    /// Reject every queued and in-flight task with [`Error::Terminated`] and
    /// stop all workers. Later submissions are rejected the same way.
    fn terminate(&self);

    /// Engine name (e.g. "sync", "pool")
    fn name(&self) -> &str;
}

/// Pending result of a queued task.
///
/// Resolves to [`Error::Terminated`] if the engine drops the task without
/// answering.
#[must_use = "a TaskHandle does nothing unless awaited"]
#[derive(Debug)]
pub struct TaskHandle {
    rx: oneshot::Receiver<Result<TaskOutput>>,
}

/// Sending half of a [`TaskHandle`], held by whoever runs the task.
#[derive(Debug)]
pub struct TaskResolver {
    tx: oneshot::Sender<Result<TaskOutput>>,
}

impl TaskHandle {
    /// Create a connected resolver/handle pair.
    pub fn channel() -> (TaskResolver, TaskHandle) {
        let (tx, rx) = oneshot::channel();
        (TaskResolver { tx }, TaskHandle { rx })
    }

    /// A handle that is already resolved.
    pub fn ready(outcome: Result<TaskOutput>) -> Self {
        let (resolver, handle) = Self::channel();
        resolver.resolve(outcome);
        handle
    }

    /// A handle already rejected with [`Error::Terminated`].
    pub fn terminated() -> Self {
        Self::ready(Err(Error::Terminated))
    }
}

impl TaskResolver {
    /// Deliver the outcome. A caller that stopped waiting is not an error.
    pub fn resolve(self, outcome: Result<TaskOutput>) {
        let _ = self.tx.send(outcome);
    }

    /// Reject with [`Error::Terminated`].
    pub fn terminate(self) {
        self.resolve(Err(Error::Terminated));
    }

    /// Whether the waiting side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Future for TaskHandle {
    type Output = Result<TaskOutput>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|r| r.unwrap_or(Err(Error::Terminated)))
    }
}
