//! Task execution: the message handler shared by every engine.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use ds_core::{Error, Result, TaskOutput, TaskPayload};
use ds_prob::{
    Extracted, ProbabilityMapBuilder, compound, extract_cumulative_probability, make_pmap, pow,
};

/// How much timing information runners report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProfilingLevel {
    /// No messages.
    #[default]
    None,
    /// One "Total for ..." line per task.
    Info,
    /// Per-stage timings as well.
    Debug,
}

impl FromStr for ProfilingLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            other => Err(format!("unknown profiling level '{other}' (expected none|info|debug)")),
        }
    }
}

impl fmt::Display for ProfilingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Info => "info",
            Self::Debug => "debug",
        })
    }
}

/// Per-task handle given to a [`TaskRunner`]: the engine's cancel flag and
/// a sink for informational messages.
pub struct TaskContext<'a> {
    cancel: &'a AtomicBool,
    sink: &'a mut dyn FnMut(String),
}

impl<'a> TaskContext<'a> {
    /// Wrap a cancel flag and message sink.
    pub fn new(cancel: &'a AtomicBool, sink: &'a mut dyn FnMut(String)) -> Self {
        Self { cancel, sink }
    }

    /// The flag raised when the engine terminates.
    pub fn cancel_flag(&self) -> &'a AtomicBool {
        self.cancel
    }

    /// Whether the engine has asked this task to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Forward an informational message to the engine.
    pub fn info(&mut self, message: impl Into<String>) {
        (self.sink)(message.into());
    }
}

/// Executes one task to completion.
pub trait TaskRunner: Send + Sync {
    /// Run `payload`, polling `ctx` for cancellation where practical.
    fn run(&self, payload: TaskPayload, ctx: &mut TaskContext<'_>) -> Result<TaskOutput>;
}

/// Default runner: generate / pow / compound via `ds-prob`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistributionRunner {
    profiling: ProfilingLevel,
}

impl DistributionRunner {
    /// Runner reporting at `profiling`.
    pub fn new(profiling: ProfilingLevel) -> Self {
        Self { profiling }
    }

    /// Configured profiling level.
    pub fn profiling(&self) -> ProfilingLevel {
        self.profiling
    }
}

impl TaskRunner for DistributionRunner {
    fn run(&self, payload: TaskPayload, ctx: &mut TaskContext<'_>) -> Result<TaskOutput> {
        if ctx.is_cancelled() {
            return Err(Error::Terminated);
        }
        let t0 = Instant::now();
        let label = payload.label();

        let Extracted { distribution, total_p } = match payload {
            TaskPayload::Generate { prizes, tickets, p_cutoff } => {
                let builder = ProbabilityMapBuilder::new(&prizes, p_cutoff).interrupt(ctx.cancel_flag());
                let map = if self.profiling >= ProfilingLevel::Debug {
                    builder.build_observed(tickets, |stage| {
                        ctx.info(format!("{}: {:.3}ms", stage.label, stage.elapsed.as_secs_f64() * 1e3))
                    })?
                } else {
                    builder.build(tickets)?
                };
                extract_cumulative_probability(&map, p_cutoff)
            }
            TaskPayload::Pow { cumulative_p, power, p_cutoff } => {
                let single = make_pmap(&cumulative_p);
                extract_cumulative_probability(&pow(&single, power, p_cutoff), p_cutoff)
            }
            TaskPayload::Compound { parts, p_cutoff } => {
                extract_cumulative_probability(&compound(&parts, p_cutoff), p_cutoff)
            }
        };

        if self.profiling >= ProfilingLevel::Info {
            ctx.info(format!("Total for {label}: {:.3}ms", t0.elapsed().as_secs_f64() * 1e3));
        }
        Ok(TaskOutput { cumulative_p: distribution, normalisation: total_p })
    }
}

/// Run `payload` on `runner`; a panicking runner yields a
/// [`Error::Computation`] instead of unwinding into the engine.
pub(crate) fn run_guarded(
    runner: &dyn TaskRunner,
    payload: TaskPayload,
    ctx: &mut TaskContext<'_>,
) -> Result<TaskOutput> {
    let label = payload.label();
    panic::catch_unwind(AssertUnwindSafe(|| runner.run(payload, ctx))).unwrap_or_else(|cause| {
        let reason = cause
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| cause.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::error!(task = %label, %reason, "task panicked");
        Err(Error::Computation(format!("task {label} panicked: {reason}")))
    })
}

/// Run `payload` on `runner` with a fresh context, logging forwarded
/// messages under `engine`.
pub(crate) fn run_logged(
    runner: &dyn TaskRunner,
    payload: TaskPayload,
    cancel: &AtomicBool,
    engine: &str,
) -> Result<TaskOutput> {
    let mut sink = |message: String| tracing::info!(target: "ds_compute", engine, "{message}");
    run_guarded(runner, payload, &mut TaskContext::new(cancel, &mut sink))
}
