//! The draw itself: validated schedule, memoised entries, compounding.

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};

use ds_core::{
    ComputeEngine, CompoundPart, CumulativeDistribution, Entry, Error, PrizeTier, Result, TaskPayload,
};

use crate::config::{RaffleConfig, Schedule, check_p_cutoff, whole};
use crate::memo::Memo;
use crate::results::Results;

/// Pending [`Results`]; resolves on the engine.
pub type ResultsFuture = BoxFuture<'static, Result<Results>>;

/// Per-call task settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaskOptions {
    /// Pruning threshold; the raffle default when `None`.
    pub p_cutoff: Option<f64>,
    /// Engine priority (higher first).
    pub priority: i32,
}

/// Reinvestment rule for [`Raffle::compound`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompoundOptions {
    /// Ticket holding cap; the audience when `None`.
    pub max_tickets: Option<u64>,
    /// Winnings needed to buy one more ticket.
    pub ticket_cost: u64,
    /// Pruning threshold; the raffle default when `None`.
    pub p_cutoff: Option<f64>,
    /// Engine priority (higher first).
    pub priority: i32,
}

impl Default for CompoundOptions {
    fn default() -> Self {
        Self { max_tickets: None, ticket_cost: 1, p_cutoff: None, priority: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EntryKey {
    tickets: u64,
    p_cutoff: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RoundKey {
    tickets: u64,
    round: u32,
    max_tickets: u64,
    ticket_cost: u64,
    p_cutoff: u64,
}

/// A prize draw bound to a compute engine. Cheap to clone; clones share
/// the memoised results.
#[derive(Clone)]
pub struct Raffle {
    inner: Arc<Inner>,
}

struct Inner {
    schedule: Schedule,
    engine: Arc<dyn ComputeEngine>,
    entries: Memo<EntryKey>,
    rounds: Memo<RoundKey>,
}

impl Raffle {
    /// Validate `config` and bind it to `engine`.
    pub fn new(config: RaffleConfig, engine: Arc<dyn ComputeEngine>) -> Result<Self> {
        let schedule = Schedule::try_from(&config)?;
        tracing::debug!(
            audience = schedule.audience,
            tiers = schedule.prizes.len(),
            engine = engine.name(),
            "raffle created"
        );
        Ok(Self { inner: Arc::new(Inner { schedule, engine, entries: Memo::new(), rounds: Memo::new() }) })
    }

    /// Total tickets in the draw.
    pub fn audience(&self) -> u64 {
        self.inner.schedule.audience
    }

    /// Prize tiers, rarest first, including the zero-value filler.
    pub fn prizes(&self) -> &[PrizeTier] {
        &self.inner.schedule.prizes
    }

    /// Default pruning threshold.
    pub fn p_cutoff(&self) -> f64 {
        self.inner.schedule.p_cutoff
    }

    /// Engine running this raffle's tasks.
    pub fn engine(&self) -> &Arc<dyn ComputeEngine> {
        &self.inner.engine
    }

    /// Ticket counts with a pending or finished result.
    pub fn cached_entries(&self) -> usize {
        self.inner.entries.len()
    }

    /// Winnings distribution for `tickets` tickets.
    pub fn enter(&self, tickets: u64) -> Result<ResultsFuture> {
        self.enter_with(tickets, TaskOptions::default())
    }

    /// [`enter`](Self::enter) for untyped input (e.g. from a form or JSON).
    pub fn enter_raw(&self, tickets: f64) -> Result<ResultsFuture> {
        let tickets = whole(tickets).ok_or_else(|| Error::validation("Invalid ticket count"))?;
        self.enter(tickets)
    }

    /// [`enter`](Self::enter) with explicit task settings.
    ///
    /// Input is validated before anything is queued. Concurrent and repeated
    /// calls for the same ticket count share one engine task.
    pub fn enter_with(&self, tickets: u64, options: TaskOptions) -> Result<ResultsFuture> {
        if tickets > self.audience() {
            return Err(Error::validation("Invalid ticket count"));
        }
        let p_cutoff = self.resolve_p_cutoff(options.p_cutoff)?;
        Ok(self.inner.entry(tickets, p_cutoff, options.priority))
    }

    /// Distribution of the running total after `periods` draws when every
    /// `ticket_cost` of winnings buys another ticket (up to `max_tickets`).
    ///
    /// Winnings beyond the cap still count towards the total.
    pub fn compound(&self, tickets: u64, periods: u32, options: CompoundOptions) -> Result<ResultsFuture> {
        if options.ticket_cost == 0 {
            return Err(Error::validation("Invalid ticket cost"));
        }
        let max_tickets = options.max_tickets.unwrap_or(self.audience());
        if max_tickets > self.audience() || tickets > max_tickets {
            return Err(Error::validation("Invalid ticket count"));
        }
        let p_cutoff = self.resolve_p_cutoff(options.p_cutoff)?;

        if periods == 0 {
            return Ok(future::ready(Ok(self.inner.zero(tickets))).boxed());
        }
        let key = RoundKey {
            tickets,
            round: periods,
            max_tickets,
            ticket_cost: options.ticket_cost,
            p_cutoff: p_cutoff.to_bits(),
        };
        Ok(self.inner.round(key, options.priority))
    }

    fn resolve_p_cutoff(&self, p_cutoff: Option<f64>) -> Result<f64> {
        p_cutoff.map_or(Ok(self.p_cutoff()), check_p_cutoff)
    }
}

impl fmt::Debug for Raffle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raffle")
            .field("audience", &self.audience())
            .field("prizes", &self.prizes())
            .field("p_cutoff", &self.p_cutoff())
            .field("engine", &self.inner.engine.name())
            .finish()
    }
}

impl Inner {
    fn zero(&self, tickets: u64) -> Results {
        Results::zero(tickets, Arc::clone(&self.engine)).with_p_cutoff(self.schedule.p_cutoff)
    }

    fn results(&self, tickets: u64, distribution: CumulativeDistribution) -> Result<Results> {
        wrap(tickets, distribution, &self.engine, self.schedule.p_cutoff)
    }

    fn entry(self: &Arc<Self>, tickets: u64, p_cutoff: f64, priority: i32) -> ResultsFuture {
        if tickets == 0 {
            return future::ready(Ok(self.zero(0))).boxed();
        }

        let key = EntryKey { tickets, p_cutoff: p_cutoff.to_bits() };
        let shared = self.entries.get_or_insert_with(key, || {
            tracing::debug!(tickets, p_cutoff, priority, "queueing entry");
            let payload = TaskPayload::Generate { prizes: self.schedule.prizes.clone(), tickets, p_cutoff };
            let handle = self.engine.queue_task(payload, priority);
            // the memo lives in `Inner`, so the stored future must not own it
            let (engine, default_cutoff) = (Arc::clone(&self.engine), self.schedule.p_cutoff);
            async move {
                let out = handle.await?;
                wrap(tickets, out.cumulative_p, &engine, default_cutoff)
            }
            .boxed()
        });

        let inner = Arc::clone(self);
        async move { inner.entries.resolve(key, shared).await }.boxed()
    }

    fn round(self: &Arc<Self>, key: RoundKey, priority: i32) -> ResultsFuture {
        if key.round <= 1 {
            return self.entry(key.tickets, f64::from_bits(key.p_cutoff), priority);
        }
        let shared = self.rounds.get_or_insert_with(key, || {
            let inner = Arc::clone(self);
            async move { inner.next_round(key, priority).await }.boxed()
        });
        let inner = Arc::clone(self);
        async move { inner.rounds.resolve(key, shared).await }.boxed()
    }

    /// Round `key.round` from round `key.round - 1`: every outcome re-enters
    /// with its winnings converted to extra tickets, then the branches are
    /// merged with the outcome as baseline.
    async fn next_round(self: Arc<Self>, key: RoundKey, priority: i32) -> Result<Results> {
        let prev = self.round(RoundKey { round: key.round - 1, ..key }, priority).await?;
        let p_cutoff = f64::from_bits(key.p_cutoff);

        let outcomes: Vec<Entry> = prev.distribution().entries().collect();
        let branches = future::try_join_all(outcomes.iter().map(|e| {
            let extra = e.value as u64 / key.ticket_cost;
            let tickets = key.tickets.saturating_add(extra).min(key.max_tickets);
            self.entry(tickets, p_cutoff, priority)
        }))
        .await?;

        let parts: Vec<CompoundPart> = outcomes
            .iter()
            .zip(branches)
            .map(|(e, r)| CompoundPart { p: e.p, value: e.value as u64, r: r.distribution().clone() })
            .collect();
        tracing::debug!(tickets = key.tickets, round = key.round, parts = parts.len(), "compounding");

        let out = self.engine.queue_task(TaskPayload::Compound { parts, p_cutoff }, priority).await?;
        self.results(key.tickets, out.cumulative_p)
    }
}

fn wrap(
    tickets: u64,
    distribution: CumulativeDistribution,
    engine: &Arc<dyn ComputeEngine>,
    p_cutoff: f64,
) -> Result<Results> {
    Ok(Results::new(tickets, distribution, Arc::clone(engine))?.with_p_cutoff(p_cutoff))
}
