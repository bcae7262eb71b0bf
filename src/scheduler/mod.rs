//! Scheduler core: shared queue, admission gate, load monitor, workers and the dispatcher.
//!
//! Data flow:
//! 1. The producer pushes tasks into the shared [`PriorityQueue`]
//! 2. Workers wait (bounded) for work, get admitted by the [`AdmissionGate`], pop the
//!    highest-priority task and execute it
//! 3. After each admission the [`LoadMonitor`] checks occupancy and may add one reserve slot
//!    plus one reserve worker
//! 4. [`Scheduler::close`] stops waiting for new work; workers drain the queue and exit, and
//!    [`Scheduler::join`] collects the [`RunReport`](crate::metrics::RunReport)

pub mod dispatcher;
pub mod gate;
pub mod monitor;
pub mod queue;
pub(crate) mod worker;

pub use dispatcher::Scheduler;
pub use gate::{Admission, AdmissionGate};
pub use monitor::LoadMonitor;
pub use queue::PriorityQueue;

use crate::config::SchedulerConfig;
use crate::metrics::{RunReport, RunStats};

/// Everything the dispatcher and the workers share for one run.
///
/// One instance exists per [`Scheduler`] and is handed to each worker behind an `Arc`, so
/// independent schedulers never share state.
#[derive(Debug)]
pub struct SchedulerState {
    pub config: SchedulerConfig,
    pub queue: PriorityQueue,
    pub gate: AdmissionGate,
    pub monitor: LoadMonitor,
    pub stats: RunStats,
}

impl SchedulerState {
    /// Build the shared state from an already validated configuration.
    pub(crate) fn new(config: SchedulerConfig) -> Self {
        Self {
            queue: PriorityQueue::new(),
            gate: AdmissionGate::new(config.base_capacity),
            monitor: LoadMonitor::new(config.base_capacity, config.load_threshold_pct),
            stats: RunStats::new(),
            config,
        }
    }

    /// Shutdown is the queue's closed flag, so it is ordered with every push under the queue lock.
    pub fn is_shutdown_requested(&self) -> bool {
        self.queue.is_closed()
    }

    /// Close the queue.
    ///
    /// # Returns
    /// `true` for the call that performed the open→closed transition, `false` afterwards
    pub(crate) fn request_shutdown(&self) -> bool {
        self.queue.close()
    }

    /// Terminal condition for an idle worker: no more work will arrive and none is queued.
    pub(crate) fn drained(&self) -> bool {
        self.queue.is_drained()
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            tasks_completed: self.stats.tasks_completed(),
            tasks_failed: self.stats.tasks_failed(),
            tasks_total: self.stats.tasks_total(),
            retries: self.stats.retries(),
            expanded: self.monitor.expanded(),
            base_capacity: self.gate.base_capacity(),
            total_capacity: self.gate.total_capacity(),
            peak_in_use: self.gate.peak_in_use(),
            workers_spawned: self.stats.workers_spawned(),
            completed_by_priority: self.stats.completed_by_priority(),
            elapsed: self.stats.elapsed(),
        }
    }
}
