//! # ds-compute
//!
//! Compute engines for drawstat. Every engine implements
//! [`ds_core::ComputeEngine`] and runs tasks through a [`TaskRunner`]
//! (by default [`DistributionRunner`]).
//!
//! ## Architecture
//!
//! ```text
//! ComputeEngine::queue_task ──► SynchronousEngine  (caller's thread)
//!                          ├──► SingleWorkerEngine (thread per task)
//!                          └──► WorkerPool         (scheduler + N workers)
//!                                     │
//!                                     ▼
//!                               TaskRunner::run ──► ds-prob
//! ```
//!
//! Runners may emit informational messages ([`ProfilingLevel`]); engines
//! log them with `tracing` under the `ds_compute` target.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pool;
mod queue;
pub mod runner;
pub mod single;
pub mod sync;

pub use pool::{DEFAULT_WORKERS, PoolConfig, WorkerPool};
pub use runner::{DistributionRunner, ProfilingLevel, TaskContext, TaskRunner};
pub use single::SingleWorkerEngine;
pub use sync::SynchronousEngine;
