//! Prize schedules and the engine task wire format.

use serde::{Deserialize, Serialize};

use crate::CumulativeDistribution;

/// Prizes of one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrizeTier {
    /// Prize value in whole currency units.
    pub value: u64,
    /// Number of prizes of this value.
    pub count: u64,
}

impl PrizeTier {
    /// Create a new tier
    pub fn new(value: u64, count: u64) -> Self {
        Self { value, count }
    }
}

/// One reinvestment branch of a `compound` task: with probability `p` the
/// running total is `value`, and the next draw is distributed as `r`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundPart {
    /// Branch weight.
    pub p: f64,
    /// Baseline added to every outcome of `r`.
    pub value: u64,
    /// Distribution of the next draw.
    pub r: CumulativeDistribution,
}

/// Work accepted by a `ComputeEngine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum TaskPayload {
    /// Winnings distribution for `tickets` tickets.
    ///
    /// `prizes` must be ordered rarest first with the filler tier last.
    Generate {
        /// Prize schedule, rarest first.
        prizes: Vec<PrizeTier>,
        /// Tickets held.
        tickets: u64,
        /// Minimum probability mass retained.
        p_cutoff: f64,
    },
    /// Distribution of the sum of `power` independent draws.
    Pow {
        /// Single-draw distribution.
        cumulative_p: CumulativeDistribution,
        /// Number of draws.
        power: u32,
        /// Minimum probability mass retained.
        p_cutoff: f64,
    },
    /// Weighted union of shifted distributions.
    Compound {
        /// Branches to merge.
        parts: Vec<CompoundPart>,
        /// Minimum probability mass retained.
        p_cutoff: f64,
    },
}

impl TaskPayload {
    /// Task type name as used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Generate { .. } => "generate",
            Self::Pow { .. } => "pow",
            Self::Compound { .. } => "compound",
        }
    }

    /// Short human label for profiling messages.
    pub fn label(&self) -> String {
        match self {
            Self::Generate { tickets, .. } => format!("generate {tickets}"),
            Self::Pow { power, .. } => format!("pow {power}"),
            Self::Compound { parts, .. } => format!("compound ({} parts)", parts.len()),
        }
    }
}

/// Resolved value of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutput {
    /// Normalised cumulative distribution.
    pub cumulative_p: CumulativeDistribution,
    /// Total mass before normalisation (1 up to pruning and rounding).
    pub normalisation: f64,
}
