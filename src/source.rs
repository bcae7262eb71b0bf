//! Task sources feeding the scheduler.
//!
//! Anything yielding [`Task`]s can drive a run: every `Iterator<Item = Task>` is a
//! [`TaskSource`], and [`RandomTaskSource`] generates the demo workload (priorities 1..=5,
//! durations of 1..=5 time units). [`run_source`] is the producer loop.

use crate::error::SchedulerError;
use crate::scheduler::Scheduler;
use crate::task::Task;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

pub const MIN_PRIORITY: i32 = 1;
pub const MAX_PRIORITY: i32 = 5;
pub const MIN_DURATION_UNITS: u32 = 1;
pub const MAX_DURATION_UNITS: u32 = 5;

/// Producer of tasks for one run.
pub trait TaskSource {
    /// Next task, or `None` once the source is exhausted.
    fn next_task(&mut self) -> Option<Task>;
}

impl<I> TaskSource for I
where
    I: Iterator<Item = Task>,
{
    fn next_task(&mut self) -> Option<Task> {
        self.next()
    }
}

/// Fixed-size source of uniformly random tasks with ids starting at 1.
#[derive(Debug)]
pub struct RandomTaskSource {
    rng: StdRng,
    next_id: u64,
    remaining: usize,
    time_unit: Duration,
}

impl RandomTaskSource {
    /// `count` tasks whose durations are whole multiples of `time_unit`.
    pub fn new(count: usize, time_unit: Duration) -> Self {
        Self::from_rng(StdRng::from_entropy(), count, time_unit)
    }

    /// Same as [`new`](RandomTaskSource::new) with a reproducible sequence.
    pub fn with_seed(count: usize, time_unit: Duration, seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed), count, time_unit)
    }

    fn from_rng(rng: StdRng, count: usize, time_unit: Duration) -> Self {
        Self {
            rng,
            next_id: 1,
            remaining: count,
            time_unit,
        }
    }
}

impl Iterator for RandomTaskSource {
    type Item = Task;

    fn next(&mut self) -> Option<Task> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let priority = self.rng.gen_range(MIN_PRIORITY..=MAX_PRIORITY);
        let units = self.rng.gen_range(MIN_DURATION_UNITS..=MAX_DURATION_UNITS);
        let task = Task::new(self.next_id, priority, self.time_unit * units);
        self.next_id += 1;
        Some(task)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Push every task from `source` into `scheduler`, pausing `interval` between tasks, then close
/// the scheduler.
///
/// A message on `stop` (for example from a Ctrl+C handler) ends production early; tasks already
/// pushed still run. `close` is called exactly once on every path, including errors.
///
/// # Returns
/// Number of tasks pushed
pub fn run_source<S: TaskSource>(
    scheduler: &Scheduler,
    mut source: S,
    interval: Duration,
    stop: &Receiver<()>,
) -> Result<usize, SchedulerError> {
    let mut produced = 0;
    let outcome = loop {
        let Some(task) = source.next_task() else {
            break Ok(());
        };
        info!(
            task = task.id(),
            priority = task.priority(),
            duration_ms = task.duration().as_millis() as u64,
            "task generated"
        );
        if let Err(err) = scheduler.push(task) {
            break Err(err);
        }
        produced += 1;

        match stop.recv_timeout(interval) {
            Ok(()) => {
                warn!(produced, "stop requested, no more tasks will be generated");
                break Ok(());
            }
            Err(RecvTimeoutError::Timeout) => {}
            // Nobody can send a stop signal any more: keep the pacing without it.
            Err(RecvTimeoutError::Disconnected) => thread::sleep(interval),
        }
    };

    scheduler.close();
    outcome.map(|()| produced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crossbeam_channel::{bounded, never};

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            base_capacity: 2,
            poll_timeout: Duration::from_millis(10),
            ..SchedulerConfig::default()
        }
    }

    #[test]
    fn random_source_yields_requested_count_in_range() {
        let unit = Duration::from_millis(10);
        let tasks: Vec<Task> = RandomTaskSource::new(50, unit).collect();
        assert_eq!(tasks.len(), 50);
        for (index, task) in tasks.iter().enumerate() {
            assert_eq!(task.id(), index as u64 + 1);
            assert!((MIN_PRIORITY..=MAX_PRIORITY).contains(&task.priority()));
            assert!(task.duration() >= unit * MIN_DURATION_UNITS);
            assert!(task.duration() <= unit * MAX_DURATION_UNITS);
            assert_eq!(task.duration().as_millis() % 10, 0);
        }
    }

    #[test]
    fn seeded_source_is_reproducible() {
        let unit = Duration::from_millis(1);
        let a: Vec<Task> = RandomTaskSource::with_seed(20, unit, 7).collect();
        let b: Vec<Task> = RandomTaskSource::with_seed(20, unit, 7).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn run_source_pushes_everything_and_closes() {
        let scheduler = Scheduler::new(fast_config()).unwrap();
        scheduler.start().unwrap();

        let tasks = (1..=6).map(|id| Task::new(id, (id % 3) as i32, Duration::from_millis(2)));
        let produced = run_source(&scheduler, tasks, Duration::ZERO, &never()).unwrap();
        assert_eq!(produced, 6);
        assert!(scheduler.state().is_shutdown_requested());

        let report = scheduler.join().unwrap();
        assert_eq!(report.tasks_total, 6);
        assert_eq!(report.tasks_completed, 6);
    }

    #[test]
    fn stop_signal_ends_production_early() {
        let scheduler = Scheduler::new(fast_config()).unwrap();
        scheduler.start().unwrap();

        let (stop_tx, stop_rx) = bounded(1);
        stop_tx.send(()).unwrap();
        let source = RandomTaskSource::with_seed(10, Duration::from_millis(1), 3);
        let produced = run_source(&scheduler, source, Duration::from_secs(1), &stop_rx).unwrap();
        assert_eq!(produced, 1);

        let report = scheduler.join().unwrap();
        assert_eq!(report.tasks_total, 1);
        assert_eq!(report.tasks_completed, 1);
    }

    #[test]
    fn disconnected_stop_channel_does_not_stop_production() {
        let scheduler = Scheduler::new(fast_config()).unwrap();
        scheduler.start().unwrap();

        let (stop_tx, stop_rx) = bounded::<()>(1);
        drop(stop_tx);
        let source = RandomTaskSource::with_seed(3, Duration::from_millis(1), 11);
        let produced = run_source(&scheduler, source, Duration::from_millis(1), &stop_rx).unwrap();
        assert_eq!(produced, 3);
        assert_eq!(scheduler.join().unwrap().tasks_completed, 3);
    }
}
