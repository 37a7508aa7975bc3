//! # ds-core
//!
//! Core types for drawstat.
//!
//! This crate defines the vocabulary shared by every other crate:
//! - the error type and `Result` alias
//! - prize schedules and task payloads (the engine wire format)
//! - `CumulativeDistribution`, the dense result buffer, and its queries
//! - the `ComputeEngine` trait and the `TaskHandle` future it returns
//!
//! ## Architecture
//!
//! The façade (ds-raffle) depends on the `ComputeEngine` trait defined here,
//! NOT on the concrete engines in ds-compute. Tests can swap in the
//! synchronous engine, production code a worker pool.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod distribution;
pub mod engine;
pub mod error;
pub mod types;

pub use distribution::{CumulativeDistribution, Entry};
pub use engine::{ComputeEngine, TaskHandle, TaskResolver};
pub use error::{Error, Result};
pub use types::{CompoundPart, PrizeTier, TaskOutput, TaskPayload};

/// Crate version, shared by the CLI's `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
