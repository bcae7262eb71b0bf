//! Task representation shared by the queue, the workers and the task sources.

use std::fmt;
use std::time::Duration;

/// One unit of simulated, compute-bound work.
///
/// Tasks are immutable once built: the queue owns them until a worker pops one, the worker owns
/// it while executing, and it is dropped when execution finishes. Lower `priority` values are
/// served first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: u64,
    priority: i32,
    duration: Duration,
}

impl Task {
    /// Build a task with an estimated execution `duration`.
    pub fn new(id: u64, priority: i32, duration: Duration) -> Self {
        Self {
            id,
            priority,
            duration,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Scheduling priority (1 is more urgent than 5).
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Estimated execution time; the simulated executor sleeps for exactly this long.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "task {} (priority {}, {} ms)",
            self.id,
            self.priority,
            self.duration.as_millis()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_exposes_its_fields() {
        let task = Task::new(7, 2, Duration::from_millis(30));
        assert_eq!(task.id(), 7);
        assert_eq!(task.priority(), 2);
        assert_eq!(task.duration(), Duration::from_millis(30));
    }

    #[test]
    fn task_display_is_readable() {
        let task = Task::new(3, 1, Duration::from_secs(2));
        assert_eq!(task.to_string(), "task 3 (priority 1, 2000 ms)");
    }
}
