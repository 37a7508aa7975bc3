//! drawstat CLI

mod schedule;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, ensure};
use clap::{Parser, Subcommand, ValueEnum};
use ds_compute::{
    DEFAULT_WORKERS, DistributionRunner, PoolConfig, ProfilingLevel, SingleWorkerEngine,
    SynchronousEngine, WorkerPool,
};
use ds_core::ComputeEngine;
use ds_raffle::{CompoundOptions, Raffle, Results, TaskOptions};

#[derive(Parser)]
#[command(name = "drawstat")]
#[command(about = "drawstat - Winnings distributions for large prize draws")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    /// Compute engine
    #[arg(long, global = true, value_enum, default_value_t = EngineKind::Pool)]
    engine: EngineKind,

    /// Worker threads for the pool engine
    #[arg(long, global = true, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Engine profiling messages (none, info, debug); logged at INFO
    #[arg(long, global = true, default_value = "none")]
    profile: ProfilingLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineKind {
    /// Run in the calling thread
    Sync,
    /// One thread per task
    Single,
    /// Persistent worker pool with priorities
    Pool,
}

#[derive(Subcommand)]
enum Commands {
    /// Winnings distribution for a ticket holding
    Enter {
        /// Prize schedule (JSON or YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Tickets held
        #[arg(long)]
        tickets: u64,

        /// Number of independent draws to sum
        #[arg(long, default_value = "1")]
        power: u32,

        /// Pruning threshold (defaults to the schedule's pCutoff)
        #[arg(long)]
        p_cutoff: Option<f64>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Distribution after reinvesting winnings as extra tickets
    Compound {
        /// Prize schedule (JSON or YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Tickets held at the start
        #[arg(long)]
        tickets: u64,

        /// Number of draws
        #[arg(long)]
        periods: u32,

        /// Ticket holding cap (defaults to the audience)
        #[arg(long)]
        max_tickets: Option<u64>,

        /// Winnings needed to buy one ticket
        #[arg(long, default_value = "1")]
        ticket_cost: u64,

        /// Pruning threshold (defaults to the schedule's pCutoff)
        #[arg(long)]
        p_cutoff: Option<f64>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Hypergeometric odds table for 0..=samples successes
    Odds {
        /// Population size
        #[arg(long)]
        total: u64,

        /// Successes in the population
        #[arg(long)]
        targets: u64,

        /// Draws without replacement
        #[arg(long)]
        samples: u64,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Enter { config, tickets, power, p_cutoff, output } => {
            let engine = build_engine(&cli.engine, cli.workers, cli.profile)?;
            let raffle = Raffle::new(schedule::read_raffle_config(&config)?, Arc::clone(&engine))?;
            let options = TaskOptions { p_cutoff, priority: 0 };
            let single = raffle.enter_with(tickets, options)?.await?;
            let result = single.pow(power, options)?.await?;
            engine.terminate();
            write_json(output.as_ref(), summary(&result, engine.name()))
        }
        Commands::Compound { config, tickets, periods, max_tickets, ticket_cost, p_cutoff, output } => {
            let engine = build_engine(&cli.engine, cli.workers, cli.profile)?;
            let raffle = Raffle::new(schedule::read_raffle_config(&config)?, Arc::clone(&engine))?;
            let options = CompoundOptions { max_tickets, ticket_cost, p_cutoff, priority: 0 };
            let result = raffle.compound(tickets, periods, options)?.await?;
            engine.terminate();
            write_json(output.as_ref(), summary(&result, engine.name()))
        }
        Commands::Odds { total, targets, samples, output } => cmd_odds(total, targets, samples, output.as_ref()),
        Commands::Version => {
            println!("drawstat {}", ds_core::VERSION);
            Ok(())
        }
    }
}

fn build_engine(kind: &EngineKind, workers: usize, profiling: ProfilingLevel) -> Result<Arc<dyn ComputeEngine>> {
    let runner = Arc::new(DistributionRunner::new(profiling));
    let engine: Arc<dyn ComputeEngine> = match kind {
        EngineKind::Sync => Arc::new(SynchronousEngine::with_runner(runner)),
        EngineKind::Single => Arc::new(SingleWorkerEngine::with_runner(runner)),
        EngineKind::Pool => Arc::new(WorkerPool::with_runner(PoolConfig { workers, profiling }, runner)?),
    };
    tracing::info!(engine = engine.name(), workers, profiling = %profiling, "engine ready");
    Ok(engine)
}

fn cmd_odds(total: u64, targets: u64, samples: u64, output: Option<&PathBuf>) -> Result<()> {
    ensure!(targets <= total, "targets ({targets}) must not exceed total ({total})");
    ensure!(samples <= total, "samples ({samples}) must not exceed total ({total})");
    let odds = ds_prob::calculate_odds(total, targets, samples);
    write_json(
        output,
        serde_json::json!({
            "total": total,
            "targets": targets,
            "samples": samples,
            "odds": odds,
        }),
    )
}

fn summary(result: &Results, engine: &str) -> serde_json::Value {
    serde_json::json!({
        "tickets": result.tickets(),
        "engine": engine,
        "min": result.min(),
        "max": result.max(),
        "mean": result.mean(),
        "median": result.median(),
        "mode": result.mode(),
        "percentiles": {
            "p5": result.percentile(5.0),
            "p25": result.percentile(25.0),
            "p75": result.percentile(75.0),
            "p95": result.percentile(95.0),
        },
        "pZero": result.exact_probability(0.0),
        "entries": result.distribution().len(),
    })
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
