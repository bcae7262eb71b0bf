// Scheduler demo binary
//
// Generates random tasks at a fixed interval, feeds them to an admission-controlled scheduler,
// and prints the completion summary once every worker has stopped. Ctrl+C stops the producer
// early; tasks already queued still run to completion.

use clap::Parser;
use elastic_scheduler::{
    run_source, FlakyExecutor, RandomTaskSource, Scheduler, SchedulerConfig, SimulatedExecutor,
    TaskExecutor,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line options. Flags override values from `--config`.
#[derive(Debug, Parser)]
#[command(name = "elastic-scheduler", version, about = "Admission-controlled elastic task scheduler demo")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "ELASTIC_SCHEDULER_CONFIG")]
    config: Option<PathBuf>,

    /// Number of base workers (admission capacity)
    #[arg(long)]
    workers: Option<usize>,

    /// Number of tasks to generate
    #[arg(long)]
    tasks: Option<usize>,

    /// Load threshold in percent of base capacity
    #[arg(long)]
    threshold: Option<u32>,

    /// Idle worker poll interval in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Attempts per task before it is counted as failed
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Pause between generated tasks in milliseconds
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,

    /// Length of one duration unit in milliseconds (tasks take 1-5 units)
    #[arg(long, default_value_t = 1000)]
    time_unit_ms: u64,

    /// Probability in [0, 1] that a task attempt fails
    #[arg(long, default_value_t = 0.0)]
    failure_rate: f64,

    /// Seed for reproducible task generation and failure injection
    #[arg(long)]
    seed: Option<u64>,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn scheduler_config(&self) -> Result<SchedulerConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => SchedulerConfig::load(path)?,
            None => SchedulerConfig::default(),
        };
        if let Some(workers) = self.workers {
            config.base_capacity = workers;
        }
        if let Some(tasks) = self.tasks {
            config.total_tasks = tasks;
        }
        if let Some(threshold) = self.threshold {
            config.load_threshold_pct = threshold;
        }
        if let Some(poll_ms) = self.poll_ms {
            config.poll_timeout = Duration::from_millis(poll_ms);
        }
        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();

    let cli = Cli::parse();
    let config = cli.scheduler_config()?;
    let total_tasks = config.total_tasks;

    let executor: Arc<dyn TaskExecutor> = if cli.failure_rate > 0.0 {
        Arc::new(FlakyExecutor::new(SimulatedExecutor, cli.failure_rate, cli.seed))
    } else {
        Arc::new(SimulatedExecutor)
    };
    let scheduler = Scheduler::with_executor(config, executor)?;

    // Ctrl+C only stops the producer; the scheduler still drains the queue.
    let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    scheduler.start()?;

    let time_unit = Duration::from_millis(cli.time_unit_ms);
    let source = match cli.seed {
        Some(seed) => RandomTaskSource::with_seed(total_tasks, time_unit, seed),
        None => RandomTaskSource::new(total_tasks, time_unit),
    };
    let produced = run_source(
        &scheduler,
        source,
        Duration::from_millis(cli.interval_ms),
        &stop_rx,
    );

    let report = scheduler.join()?;
    produced?;

    info!(
        completed = report.tasks_completed,
        failed = report.tasks_failed,
        total = report.tasks_total,
        expanded = report.expanded,
        peak_in_use = report.peak_in_use,
        "All tasks processed: {}",
        report
    );
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
