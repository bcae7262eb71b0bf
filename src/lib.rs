//! Admission-controlled priority task scheduler with one-shot elastic capacity.
//!
//! A bounded pool of worker threads consumes [`Task`]s from a shared priority queue. Every task
//! runs under an admission slot from a counting gate; when occupancy crosses the load threshold
//! with all base slots taken, the scheduler adds one reserve slot and one reserve worker. Closing
//! the scheduler stops waiting for new work but always drains what is already queued.
//!
//! ```no_run
//! use elastic_scheduler::{Scheduler, SchedulerConfig, Task};
//! use std::time::Duration;
//!
//! let scheduler = Scheduler::new(SchedulerConfig::default())?;
//! scheduler.start()?;
//! scheduler.push(Task::new(1, 2, Duration::from_millis(20)))?;
//! scheduler.close();
//! let report = scheduler.join()?;
//! assert_eq!(report.tasks_completed, 1);
//! # Ok::<(), elastic_scheduler::SchedulerError>(())
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod scheduler;
pub mod source;
pub mod task;

pub use config::{RetryPolicy, SchedulerConfig};
pub use error::{ConfigError, SchedulerError, TaskError};
pub use executor::{FlakyExecutor, SimulatedExecutor, TaskExecutor};
pub use metrics::RunReport;
pub use scheduler::Scheduler;
pub use source::{run_source, RandomTaskSource, TaskSource};
pub use task::Task;
