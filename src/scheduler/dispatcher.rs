//! Dispatcher and shutdown coordinator.
//!
//! [`Scheduler`] is the producer-facing handle: it owns the shared state, starts the base
//! workers, accepts tasks until [`Scheduler::close`], and joins every worker (the reserve worker
//! included) in [`Scheduler::join`].
//!
//! When the load monitor fires, the reserve slot it adds to the gate is paired with a new worker
//! thread. Without that thread the extra slot could never be used, because each worker holds at
//! most one admission at a time.

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::executor::{SimulatedExecutor, TaskExecutor};
use crate::metrics::RunReport;
use crate::scheduler::worker::Worker;
use crate::scheduler::SchedulerState;
use crate::task::Task;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Worker threads of one scheduler, including any reserve worker spawned at runtime.
pub(crate) struct WorkerSet {
    state: Arc<SchedulerState>,
    executor: Arc<dyn TaskExecutor>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    next_id: AtomicUsize,
}

impl WorkerSet {
    fn new(state: Arc<SchedulerState>, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            state,
            executor,
            handles: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Start one worker thread and register its handle for [`Scheduler::join`].
    fn spawn(self: &Arc<Self>) -> Result<(), SchedulerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let worker = Worker::new(
            id,
            self.state.clone(),
            self.executor.clone(),
            Arc::clone(self),
        );
        let handle = thread::Builder::new()
            .name(format!("sched-worker-{id}"))
            .spawn(move || worker.run())?;
        self.handles.lock().push(handle);
        self.state.stats.record_worker_spawned();
        Ok(())
    }

    /// Start the reserve worker that pairs with the capacity added by the load monitor.
    ///
    /// Called from inside a worker thread. A spawn failure leaves the extra gate slot in place
    /// and is only logged, since the existing workers keep draining the queue either way.
    pub(crate) fn spawn_reserve(self: &Arc<Self>) {
        match self.spawn() {
            Ok(()) => info!(
                total_capacity = self.state.gate.total_capacity(),
                "reserve worker started"
            ),
            Err(err) => error!(error = %err, "failed to start reserve worker"),
        }
    }

    /// Join workers until none are left.
    ///
    /// A worker may register the reserve worker while this loop runs; it does so before it
    /// exits, so popping until the list is empty joins it too.
    fn join_all(&self) -> Result<(), SchedulerError> {
        let mut panicked = None;
        loop {
            let Some(handle) = self.handles.lock().pop() else {
                break;
            };
            let name = handle.thread().name().unwrap_or("sched-worker").to_string();
            if handle.join().is_err() {
                error!(worker = %name, "worker thread panicked");
                panicked.get_or_insert(name);
            }
        }
        match panicked {
            Some(name) => Err(SchedulerError::WorkerPanicked(name)),
            None => Ok(()),
        }
    }
}

/// Admission-controlled priority scheduler.
///
/// Typical lifecycle: [`new`](Scheduler::new) → [`start`](Scheduler::start) →
/// [`push`](Scheduler::push)… → [`close`](Scheduler::close) → [`join`](Scheduler::join).
/// Tasks may also be pushed before `start`; they wait in the queue.
pub struct Scheduler {
    state: Arc<SchedulerState>,
    workers: Arc<WorkerSet>,
    started: AtomicBool,
}

impl Scheduler {
    /// Create a scheduler that executes tasks with the [`SimulatedExecutor`].
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::with_executor(config, Arc::new(SimulatedExecutor))
    }

    /// Create a scheduler with a custom task executor.
    pub fn with_executor(
        config: SchedulerConfig,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        let state = Arc::new(SchedulerState::new(config));
        let workers = Arc::new(WorkerSet::new(state.clone(), executor));
        Ok(Self {
            state,
            workers,
            started: AtomicBool::new(false),
        })
    }

    /// Start `base_capacity` worker threads.
    pub fn start(&self) -> Result<(), SchedulerError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SchedulerError::AlreadyStarted);
        }
        let count = self.state.config.base_capacity;
        for _ in 0..count {
            self.workers.spawn()?;
        }
        info!(
            workers = count,
            threshold_pct = self.state.config.load_threshold_pct,
            expected_tasks = self.state.config.total_tasks,
            "scheduler started"
        );
        Ok(())
    }

    /// Enqueue a task.
    ///
    /// Fails once [`close`](Scheduler::close) has been called: the workers may already have
    /// drained the queue and stopped, so a late task could never run. The closed check and the
    /// insert happen under the queue lock, so a push racing `close` is either queued before the
    /// queue closes (and drained by the workers) or rejected here.
    pub fn push(&self, task: Task) -> Result<(), SchedulerError> {
        let (id, priority) = (task.id(), task.priority());
        // Count before inserting so a worker can never complete a task that is not in the total.
        self.state.stats.record_pushed();
        if let Err(task) = self.state.queue.push(task) {
            self.state.stats.record_rejected();
            return Err(SchedulerError::Closed(task.id()));
        }
        debug!(task = id, priority, "task queued");
        Ok(())
    }

    /// Close the queue to new tasks and wake every idle worker.
    ///
    /// Workers keep running until the queue is empty. Calls after the first are no-ops.
    pub fn close(&self) {
        if !self.state.request_shutdown() {
            debug!("close called more than once");
            return;
        }
        info!(
            tasks_total = self.state.stats.tasks_total(),
            queued = self.state.queue.len(),
            "shutdown requested"
        );
    }

    /// Wait for every worker to stop and return the final report.
    ///
    /// Call [`close`](Scheduler::close) first (or use [`shutdown`](Scheduler::shutdown)):
    /// workers only stop once shutdown is requested and the queue is drained.
    pub fn join(self) -> Result<RunReport, SchedulerError> {
        self.workers.join_all()?;
        let report = self.state.report();
        info!(
            completed = report.tasks_completed,
            failed = report.tasks_failed,
            total = report.tasks_total,
            expanded = report.expanded,
            "all workers stopped"
        );
        Ok(report)
    }

    /// Close the scheduler and join its workers.
    pub fn shutdown(self) -> Result<RunReport, SchedulerError> {
        self.close();
        self.join()
    }

    /// Live view of the run counters.
    pub fn snapshot(&self) -> RunReport {
        self.state.report()
    }

    /// Shared state of this run, for inspection in tests and tooling.
    pub fn state(&self) -> &SchedulerState {
        &self.state
    }
}
