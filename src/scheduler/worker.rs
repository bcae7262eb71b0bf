//! Worker control loop.
//!
//! Each worker cycles through Idle → Admitted → Executing → Releasing → Idle until it observes
//! the drained condition and stops:
//! 1. Idle: wait (bounded by the poll interval) for queued work or shutdown
//! 2. Admitted: take an admission slot; pop a task, or give the slot back if another worker won
//!    the race for it
//! 3. Executing: let the load monitor evaluate the admission, then run the task with retries
//! 4. Releasing: drop the admission guard, giving the slot back, and loop

use crate::executor::TaskExecutor;
use crate::scheduler::dispatcher::WorkerSet;
use crate::scheduler::SchedulerState;
use crate::task::Task;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

pub(crate) struct Worker {
    id: usize,
    state: Arc<SchedulerState>,
    executor: Arc<dyn TaskExecutor>,
    workers: Arc<WorkerSet>,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        state: Arc<SchedulerState>,
        executor: Arc<dyn TaskExecutor>,
        workers: Arc<WorkerSet>,
    ) -> Self {
        Self {
            id,
            state,
            executor,
            workers,
        }
    }

    pub(crate) fn run(self) {
        debug!(worker = self.id, "worker started");
        let poll_timeout = self.state.config.poll_timeout;

        loop {
            if !self.state.queue.wait_for_work(poll_timeout) {
                // Woken by timeout or shutdown with nothing queued: re-check both conditions
                // before deciding to stop.
                if self.state.drained() {
                    break;
                }
                continue;
            }

            // Held until the task is finished; dropping it also releases the slot if the
            // executor panics.
            let admission = self.state.gate.admit();
            let Some(task) = self.state.queue.try_pop() else {
                // Never hold capacity while waiting for work.
                drop(admission);
                continue;
            };

            if self.state.monitor.observe(admission.in_use(), &self.state.gate) {
                self.workers.spawn_reserve();
            }

            self.execute(task);
            drop(admission);
        }

        debug!(worker = self.id, "worker stopped");
    }

    /// Run `task` to completion, retrying in place according to the configured policy.
    fn execute(&self, task: Task) {
        let policy = &self.state.config.retry;
        info!(
            worker = self.id,
            task = task.id(),
            priority = task.priority(),
            duration_ms = task.duration().as_millis() as u64,
            "processing task"
        );

        let mut attempt = 1;
        loop {
            match self.executor.execute(&task) {
                Ok(()) => {
                    self.state.stats.record_completed(task.priority());
                    info!(worker = self.id, task = task.id(), attempt, "task completed");
                    return;
                }
                Err(err) if attempt < policy.max_attempts => {
                    self.state.stats.record_retry();
                    warn!(
                        worker = self.id,
                        task = task.id(),
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %err,
                        "task failed, retrying"
                    );
                    if !policy.backoff.is_zero() {
                        thread::sleep(policy.backoff);
                    }
                    attempt += 1;
                }
                Err(err) => {
                    self.state.stats.record_failed();
                    error!(
                        worker = self.id,
                        task = task.id(),
                        attempt,
                        error = %err,
                        "task failed, giving up"
                    );
                    return;
                }
            }
        }
    }
}
