//! Task execution back-ends.
//!
//! Workers hand each popped task to a [`TaskExecutor`]. The default [`SimulatedExecutor`] models
//! compute-bound work by sleeping for the task's duration; [`FlakyExecutor`] wraps another
//! executor and injects random failures so the retry policy can be exercised.

use crate::error::TaskError;
use crate::task::Task;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;

/// Runs one task to completion on the calling worker thread.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, task: &Task) -> Result<(), TaskError>;
}

/// Sleeps for the task duration and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedExecutor;

impl TaskExecutor for SimulatedExecutor {
    fn execute(&self, task: &Task) -> Result<(), TaskError> {
        thread::sleep(task.duration());
        Ok(())
    }
}

/// Fails each attempt with probability `failure_rate`, otherwise delegates to `inner`.
#[derive(Debug)]
pub struct FlakyExecutor<E> {
    inner: E,
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl<E: TaskExecutor> FlakyExecutor<E> {
    /// `failure_rate` is clamped to `[0.0, 1.0]`. A fixed `seed` makes the failure pattern
    /// reproducible.
    pub fn new(inner: E, failure_rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let failure_rate = if failure_rate.is_nan() {
            0.0
        } else {
            failure_rate.clamp(0.0, 1.0)
        };
        Self {
            inner,
            failure_rate,
            rng: Mutex::new(rng),
        }
    }
}

impl<E: TaskExecutor> TaskExecutor for FlakyExecutor<E> {
    fn execute(&self, task: &Task) -> Result<(), TaskError> {
        let fail = self.rng.lock().gen_bool(self.failure_rate);
        if fail {
            return Err(TaskError::Failed {
                id: task.id(),
                reason: "injected failure".to_string(),
            });
        }
        self.inner.execute(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn simulated_executor_sleeps_for_task_duration() {
        let task = Task::new(1, 1, Duration::from_millis(25));
        let start = Instant::now();
        SimulatedExecutor.execute(&task).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn flaky_executor_respects_extreme_rates() {
        let task = Task::new(9, 3, Duration::ZERO);

        let never = FlakyExecutor::new(SimulatedExecutor, 0.0, Some(1));
        assert!((0..100).all(|_| never.execute(&task).is_ok()));

        let always = FlakyExecutor::new(SimulatedExecutor, 1.0, Some(1));
        assert_eq!(
            always.execute(&task),
            Err(TaskError::Failed {
                id: 9,
                reason: "injected failure".to_string()
            })
        );
    }

    #[test]
    fn out_of_range_rates_are_clamped() {
        let task = Task::new(2, 1, Duration::ZERO);
        assert!(FlakyExecutor::new(SimulatedExecutor, 7.5, None)
            .execute(&task)
            .is_err());
        assert!(FlakyExecutor::new(SimulatedExecutor, -1.0, None)
            .execute(&task)
            .is_ok());
    }

    #[test]
    fn seeded_failures_are_reproducible() {
        let task = Task::new(4, 2, Duration::ZERO);
        let pattern = |seed| {
            let executor = FlakyExecutor::new(SimulatedExecutor, 0.5, Some(seed));
            (0..32)
                .map(|_| executor.execute(&task).is_ok())
                .collect::<Vec<_>>()
        };
        assert_eq!(pattern(42), pattern(42));
    }
}
