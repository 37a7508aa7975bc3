//! Winnings distribution for a fixed ticket count.

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future;

use ds_core::{ComputeEngine, CumulativeDistribution, Error, Result, TaskPayload};

use crate::config::check_p_cutoff;
use crate::raffle::{ResultsFuture, TaskOptions};

/// Immutable distribution of total winnings, plus the engine that produced
/// it and the pruning threshold [`pow`](Results::pow) uses by default.
#[derive(Clone)]
pub struct Results {
    tickets: u64,
    distribution: CumulativeDistribution,
    engine: Arc<dyn ComputeEngine>,
    p_cutoff: f64,
}

impl Results {
    /// Wrap an engine output. The distribution must have at least one
    /// outcome. The default pruning threshold is zero.
    pub fn new(
        tickets: u64,
        distribution: CumulativeDistribution,
        engine: Arc<dyn ComputeEngine>,
    ) -> Result<Self> {
        if distribution.is_empty() {
            return Err(Error::Computation(format!(
                "distribution for {tickets} tickets has no surviving outcomes"
            )));
        }
        Ok(Self { tickets, distribution, engine, p_cutoff: 0.0 })
    }

    /// Certain zero winnings.
    pub fn zero(tickets: u64, engine: Arc<dyn ComputeEngine>) -> Self {
        Self { tickets, distribution: CumulativeDistribution::point(0.0), engine, p_cutoff: 0.0 }
    }

    /// Replace the default pruning threshold used by [`pow`](Self::pow).
    pub fn with_p_cutoff(mut self, p_cutoff: f64) -> Self {
        self.p_cutoff = p_cutoff;
        self
    }

    /// Default pruning threshold for [`pow`](Self::pow).
    pub fn p_cutoff(&self) -> f64 {
        self.p_cutoff
    }

    /// Tickets held.
    pub fn tickets(&self) -> u64 {
        self.tickets
    }

    /// Underlying distribution.
    pub fn distribution(&self) -> &CumulativeDistribution {
        &self.distribution
    }

    /// Lowest possible winnings.
    pub fn min(&self) -> f64 {
        self.distribution.min().unwrap_or(0.0)
    }

    /// Highest possible winnings.
    pub fn max(&self) -> f64 {
        self.distribution.max().unwrap_or(0.0)
    }

    /// Expected winnings.
    pub fn mean(&self) -> f64 {
        self.distribution.mean()
    }

    /// 50th percentile.
    pub fn median(&self) -> f64 {
        self.distribution.median()
    }

    /// Most likely winnings (lowest value on ties).
    pub fn mode(&self) -> f64 {
        self.distribution.mode()
    }

    /// Winnings of the `q`th percentile holder, `q` in `[0, 100]`.
    pub fn percentile(&self, q: f64) -> f64 {
        self.distribution.percentile(q)
    }

    /// `P(winnings < x)`.
    pub fn p_below(&self, x: f64) -> f64 {
        self.distribution.p_below(x)
    }

    /// `P(winnings == x)`.
    pub fn exact_probability(&self, x: f64) -> f64 {
        self.distribution.exact_probability(x)
    }

    /// `P(low <= winnings < high)`.
    pub fn range_probability(&self, low: f64, high: f64) -> f64 {
        self.distribution.range_probability(low, high)
    }

    /// Total winnings over `power` independent draws with the same tickets.
    ///
    /// `options.p_cutoff` falls back to [`p_cutoff`](Self::p_cutoff) and is
    /// validated before anything is queued.
    pub fn pow(&self, power: u32, options: TaskOptions) -> Result<ResultsFuture> {
        let p_cutoff = options.p_cutoff.map_or(Ok(self.p_cutoff), check_p_cutoff)?;
        let out = match power {
            0 => future::ready(Ok(Self::zero(self.tickets, Arc::clone(&self.engine)).with_p_cutoff(self.p_cutoff)))
                .boxed(),
            1 => future::ready(Ok(self.clone())).boxed(),
            _ => {
                let payload = TaskPayload::Pow { cumulative_p: self.distribution.clone(), power, p_cutoff };
                let handle = self.engine.queue_task(payload, options.priority);
                let (tickets, engine, default_cutoff) = (self.tickets, Arc::clone(&self.engine), self.p_cutoff);
                async move {
                    let out = handle.await?;
                    Ok(Results::new(tickets, out.cumulative_p, engine)?.with_p_cutoff(default_cutoff))
                }
                .boxed()
            }
        };
        Ok(out)
    }
}

impl fmt::Debug for Results {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Results")
            .field("tickets", &self.tickets)
            .field("outcomes", &self.distribution.len())
            .field("p_cutoff", &self.p_cutoff)
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl PartialEq for Results {
    fn eq(&self, other: &Self) -> bool {
        self.tickets == other.tickets && self.distribution == other.distribution
    }
}
