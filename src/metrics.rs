//! Run counters and the report handed back to the caller.
//!
//! Workers update [`RunStats`] with relaxed atomics on the hot path; [`RunReport`] is the
//! serializable snapshot assembled from those counters plus the gate and monitor state.

use crate::config::duration_millis;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Shared counters for one scheduler run.
#[derive(Debug)]
pub struct RunStats {
    started_at: Instant,
    tasks_total: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    retries: AtomicU64,
    workers_spawned: AtomicU64,
    completed_by_priority: Mutex<BTreeMap<i32, u64>>,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            tasks_total: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            workers_spawned: AtomicU64::new(0),
            completed_by_priority: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn record_pushed(&self) {
        self.tasks_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Undo a [`record_pushed`](Self::record_pushed) for a task the queue refused.
    pub fn record_rejected(&self) {
        self.tasks_total.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self, priority: i32) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        *self.completed_by_priority.lock().entry(priority).or_insert(0) += 1;
    }

    pub fn record_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_worker_spawned(&self) {
        self.workers_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tasks_total(&self) -> u64 {
        self.tasks_total.load(Ordering::Relaxed)
    }

    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed.load(Ordering::Relaxed)
    }

    pub fn tasks_failed(&self) -> u64 {
        self.tasks_failed.load(Ordering::Relaxed)
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn workers_spawned(&self) -> u64 {
        self.workers_spawned.load(Ordering::Relaxed)
    }

    pub fn completed_by_priority(&self) -> BTreeMap<i32, u64> {
        self.completed_by_priority.lock().clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Externally visible outcome of a run (or a live view of one in progress).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_total: u64,
    pub retries: u64,
    /// Whether the one-shot reserve expansion fired
    pub expanded: bool,
    pub base_capacity: usize,
    pub total_capacity: usize,
    pub peak_in_use: usize,
    /// Worker threads started, including the reserve worker
    pub workers_spawned: u64,
    pub completed_by_priority: BTreeMap<i32, u64>,
    #[serde(rename = "elapsed_ms", with = "duration_millis")]
    pub elapsed: Duration,
}

impl RunReport {
    /// True once every pushed task has either completed or exhausted its retries.
    pub fn all_processed(&self) -> bool {
        self.tasks_completed + self.tasks_failed == self.tasks_total
    }

    /// Completed share of pushed tasks in `[0.0, 1.0]`; `1.0` for an empty run.
    pub fn completion_ratio(&self) -> f64 {
        if self.tasks_total == 0 {
            return 1.0;
        }
        self.tasks_completed as f64 / self.tasks_total as f64
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tasks_completed, self.tasks_total)?;
        if self.tasks_failed > 0 {
            write!(f, " ({} failed)", self.tasks_failed)?;
        }
        Ok(())
    }
}
