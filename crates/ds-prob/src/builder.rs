//! Winnings distribution for a holder of N tickets.
//!
//! Keeps a sparse matrix of winning probabilities: one row per number of
//! tickets already assigned to a prize tier, each row a value → probability
//! map. Row 0 starts as `{0: 1}`. Tiers are applied rarest first; for each
//! tier, every row redistributes its mass over "k of the remaining tickets
//! won this tier". Rows are walked high to low so that a row is finished
//! before anything from a lower row lands in it. The last (commonest) tier
//! absorbs all remaining tickets, so only the terminal row is updated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use ds_core::{Error, PrizeTier, Result};

use crate::odds::{OddsTable, calculate_final_odds, calculate_odds_nopad_into};
use crate::pmap::ProbabilityMap;

/// Wall time spent in one stage of a build.
#[derive(Debug, Clone, PartialEq)]
pub struct StageTiming {
    /// Stage name (e.g. "Distribute 25", "Accumulate").
    pub label: String,
    /// Time spent.
    pub elapsed: Duration,
}

/// Builds the winnings distribution for a prize schedule.
///
/// `prizes` must be ordered rarest first (ascending count) with the largest
/// tier, usually the zero-value filler, last.
#[derive(Debug, Clone)]
pub struct ProbabilityMapBuilder<'a> {
    prizes: &'a [PrizeTier],
    p_cutoff: f64,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a> ProbabilityMapBuilder<'a> {
    /// Create a builder; entries at or below `p_cutoff` are pruned.
    pub fn new(prizes: &'a [PrizeTier], p_cutoff: f64) -> Self {
        Self { prizes, p_cutoff, interrupt: None }
    }

    /// Abort with [`Error::Terminated`] once `flag` is raised (polled
    /// between rows).
    pub fn interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Distribution of total winnings for `tickets` tickets.
    pub fn build(&self, tickets: u64) -> Result<ProbabilityMap> {
        self.build_observed(tickets, |_| {})
    }

    /// Like [`build`](Self::build), reporting per-stage timings.
    pub fn build_observed(
        &self,
        tickets: u64,
        mut observe: impl FnMut(StageTiming),
    ) -> Result<ProbabilityMap> {
        let Some((last, rest)) = self.prizes.split_last() else {
            return Ok(ProbabilityMap::unit());
        };
        if tickets == 0 {
            return Ok(ProbabilityMap::unit());
        }

        let mut remaining: u64 = self.prizes.iter().map(|t| t.count).sum();
        if tickets > remaining {
            return Err(Error::validation(format!(
                "cannot hold {tickets} tickets in a draw of {remaining}"
            )));
        }

        tracing::debug!(tickets, tiers = self.prizes.len(), audience = remaining, "building probability map");

        let mut rows = Rows::new(tickets);
        for tier in rest {
            let t0 = Instant::now();
            rows.apply_distribution(remaining, tier, self.p_cutoff, self.interrupt)?;
            remaining -= tier.count;
            observe(StageTiming { label: format!("Distribute {}", tier.value), elapsed: t0.elapsed() });
        }

        let t0 = Instant::now();
        rows.apply_final_distribution(remaining, last);
        observe(StageTiming { label: "Accumulate".to_string(), elapsed: t0.elapsed() });

        Ok(rows.finish())
    }
}

/// Distribution of total winnings for `tickets` tickets (uninterruptible).
pub fn calculate_probability_map(
    prizes: &[PrizeTier],
    tickets: u64,
    p_cutoff: f64,
) -> Result<ProbabilityMap> {
    ProbabilityMapBuilder::new(prizes, p_cutoff).build(tickets)
}

/// Row arena plus the scratch buffers reused across rows.
struct Rows {
    rows: Vec<ProbabilityMap>,
    scratch: ProbabilityMap,
    odds: OddsTable,
}

impl Rows {
    fn new(tickets: u64) -> Self {
        let mut rows = vec![ProbabilityMap::new(); tickets as usize + 1];
        rows[0].accumulate(0, 1.0);
        Self { rows, scratch: ProbabilityMap::new(), odds: OddsTable::new() }
    }

    fn apply_distribution(
        &mut self,
        audience: u64,
        tier: &PrizeTier,
        p_cutoff: f64,
        interrupt: Option<&AtomicBool>,
    ) -> Result<()> {
        let Self { rows, scratch, odds } = self;
        let limit = rows.len();
        let p_cutoff2 = p_cutoff * p_cutoff;

        for n in (0..limit - 1).rev() {
            if rows[n].is_empty() {
                continue;
            }
            if interrupt.is_some_and(|f| f.load(Ordering::Relaxed)) {
                return Err(Error::Terminated);
            }

            let samples = (limit - n - 1) as u64;
            calculate_odds_nopad_into(odds, audience, tier.count, samples);
            let start = odds.start() as usize;
            let values = odds.values();
            let peak = odds.peak();

            // row n is rebuilt from scratch; its old entries feed rows n..
            std::mem::swap(&mut rows[n], scratch);
            for (&value, &p) in scratch.iter() {
                if p <= p_cutoff {
                    continue;
                }
                for i in (0..=peak).rev() {
                    let pp = p * values[i];
                    if pp <= p_cutoff2 {
                        break;
                    }
                    let d = i + start;
                    rows[n + d].accumulate(value + d as u64 * tier.value, pp);
                }
                for (i, &odd) in values.iter().enumerate().skip(peak + 1) {
                    let pp = p * odd;
                    if pp <= p_cutoff2 {
                        break;
                    }
                    let d = i + start;
                    rows[n + d].accumulate(value + d as u64 * tier.value, pp);
                }
            }
            scratch.clear();
        }
        Ok(())
    }

    fn apply_final_distribution(&mut self, audience: u64, tier: &PrizeTier) {
        let target = self.rows.len() - 1;
        let (head, tail) = self.rows.split_at_mut(target);
        let dst = &mut tail[0];

        for (n, row) in head.iter().enumerate().rev() {
            if row.is_empty() {
                continue;
            }
            let i = (target - n) as u64;
            let odds = calculate_final_odds(audience, tier.count, i);
            if odds <= 0.0 {
                continue;
            }
            for (&value, &p) in row {
                let pp = p * odds;
                if pp > 0.0 {
                    dst.accumulate(value + i * tier.value, pp);
                }
            }
        }
    }

    fn finish(mut self) -> ProbabilityMap {
        self.rows.pop().unwrap_or_else(ProbabilityMap::unit)
    }
}
