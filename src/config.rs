//! Scheduler configuration.
//!
//! Every tunable has a default matching the reference deployment (five workers, 80% load
//! threshold, 100 ms poll interval). Configurations can be built in code, or loaded from a TOML
//! file where any missing key falls back to its default:
//!
//! ```toml
//! base_capacity = 4
//! load_threshold_pct = 75
//! poll_timeout_ms = 50
//!
//! [retry]
//! max_attempts = 3
//! backoff_ms = 10
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_CAPACITY: usize = 5;
pub const DEFAULT_TOTAL_TASKS: usize = 20;
pub const DEFAULT_LOAD_THRESHOLD_PCT: u32 = 80;
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// How a worker reacts when the executor reports a task failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per task, including the first one. `1` disables retries.
    pub max_attempts: u32,
    /// Pause between two attempts of the same task. The worker keeps its admission slot.
    #[serde(rename = "backoff_ms", with = "duration_millis")]
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Top-level scheduler configuration used at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of workers started by [`Scheduler::start`](crate::Scheduler::start) and initial
    /// admission capacity.
    pub base_capacity: usize,
    /// Expected number of tasks for this run. Informational only.
    pub total_tasks: usize,
    /// Load percentage (relative to `base_capacity`) above which reserve capacity is added.
    pub load_threshold_pct: u32,
    /// Upper bound on how long an idle worker sleeps before re-checking queue and shutdown.
    #[serde(rename = "poll_timeout_ms", with = "duration_millis")]
    pub poll_timeout: Duration,
    /// Failure handling for task execution.
    pub retry: RetryPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_capacity: DEFAULT_BASE_CAPACITY,
            total_tasks: DEFAULT_TOTAL_TASKS,
            load_threshold_pct: DEFAULT_LOAD_THRESHOLD_PCT,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SchedulerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject values the scheduler cannot run with.
    ///
    /// A zero capacity would block every worker in `acquire` forever, and a threshold above
    /// 100% could never be crossed while `in_use == base_capacity`. A threshold of exactly 100
    /// is accepted and disables expansion.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.load_threshold_pct > 100 {
            return Err(ConfigError::ThresholdOutOfRange(self.load_threshold_pct));
        }
        if self.poll_timeout.is_zero() {
            return Err(ConfigError::ZeroPollTimeout);
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }
}

/// Serialize a [`Duration`] as whole milliseconds.
pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = SchedulerConfig::default();
        assert_eq!(config.base_capacity, 5);
        assert_eq!(config.total_tasks, 20);
        assert_eq!(config.load_threshold_pct, 80);
        assert_eq!(config.poll_timeout, Duration::from_millis(100));
        assert_eq!(config.retry.max_attempts, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = SchedulerConfig::from_toml_str(
            "base_capacity = 3\npoll_timeout_ms = 20\n[retry]\nmax_attempts = 4\n",
        )
        .unwrap();
        assert_eq!(config.base_capacity, 3);
        assert_eq!(config.poll_timeout, Duration::from_millis(20));
        assert_eq!(config.load_threshold_pct, DEFAULT_LOAD_THRESHOLD_PCT);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.backoff, Duration::from_millis(50));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let zero = SchedulerConfig {
            base_capacity: 0,
            ..SchedulerConfig::default()
        };
        assert!(matches!(zero.validate(), Err(ConfigError::ZeroCapacity)));

        let threshold = SchedulerConfig {
            load_threshold_pct: 150,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            threshold.validate(),
            Err(ConfigError::ThresholdOutOfRange(150))
        ));

        let poll = SchedulerConfig {
            poll_timeout: Duration::ZERO,
            ..SchedulerConfig::default()
        };
        assert!(matches!(poll.validate(), Err(ConfigError::ZeroPollTimeout)));

        assert!(matches!(
            SchedulerConfig::from_toml_str("[retry]\nmax_attempts = 0\n"),
            Err(ConfigError::ZeroAttempts)
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            SchedulerConfig::from_toml_str("base_capacity = \"five\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_capacity = 2\nload_threshold_pct = 90").unwrap();

        let config = SchedulerConfig::load(file.path()).unwrap();
        assert_eq!(config.base_capacity, 2);
        assert_eq!(config.load_threshold_pct, 90);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = SchedulerConfig::load(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("missing.toml"));
    }
}
