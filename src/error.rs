//! Error types for configuration, scheduler lifecycle and task execution.
//!
//! Synchronization bugs (a release without a matching acquire, occupancy above capacity) are not
//! represented here: they panic at the point of detection.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("base_capacity must be at least 1")]
    ZeroCapacity,

    #[error("load_threshold_pct must be at most 100, got {0}")]
    ThresholdOutOfRange(u32),

    #[error("poll_timeout must be greater than zero")]
    ZeroPollTimeout,

    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("worker thread {0} panicked")]
    WorkerPanicked(String),

    #[error("task {0} pushed after the scheduler was closed")]
    Closed(u64),

    #[error("scheduler workers already started")]
    AlreadyStarted,
}

/// Failure reported by a [`TaskExecutor`](crate::executor::TaskExecutor).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task {id} failed: {reason}")]
    Failed { id: u64, reason: String },
}
