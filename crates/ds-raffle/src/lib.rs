//! # ds-raffle
//!
//! High-level API over the compute engines: describe a draw once, then ask
//! for the winnings distribution of any ticket holding.
//!
//! ```text
//! RaffleConfig ──validate──► Raffle ──enter(n)──► ResultsFuture ──► Results
//!                              │                     ▲
//!                              └── memo (per ticket count, shared)
//! ```
//!
//! Results are memoised per ticket count through shared futures, so
//! concurrent callers asking for the same holding share a single engine
//! task. Compounding (reinvesting winnings as extra tickets) builds on the
//! same memo, one round at a time.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod memo;
pub mod raffle;
pub mod results;

pub use config::{PrizeSpec, RaffleConfig};
pub use raffle::{CompoundOptions, Raffle, ResultsFuture, TaskOptions};
pub use results::Results;
