//! One-shot load-based capacity escalation.

use crate::scheduler::gate::AdmissionGate;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Watches gate occupancy at admission time and adds one reserve slot the first time the load
/// crosses the threshold while every base slot is taken.
///
/// This is an escalation, not a controller: it fires at most once per scheduler run and the
/// added capacity is never withdrawn.
#[derive(Debug)]
pub struct LoadMonitor {
    base_capacity: usize,
    threshold_pct: u32,
    expanded: AtomicBool,
}

impl LoadMonitor {
    pub fn new(base_capacity: usize, threshold_pct: u32) -> Self {
        Self {
            base_capacity,
            threshold_pct,
            expanded: AtomicBool::new(false),
        }
    }

    /// Occupancy expressed as a percentage of the base capacity (may exceed 100 after expansion).
    pub fn load_pct(&self, in_use: usize) -> usize {
        in_use * 100 / self.base_capacity
    }

    /// Evaluate the scaling policy for an admission that observed `in_use` holders.
    ///
    /// Expansion requires the load to be strictly above the threshold and `in_use` to equal the
    /// base capacity. Concurrent callers may all see the trigger condition; the single
    /// compare-and-set on `expanded` lets exactly one of them perform the expansion.
    ///
    /// # Arguments
    /// * `in_use` - Occupancy returned by [`AdmissionGate::acquire`] for this admission
    /// * `gate` - Gate whose capacity is raised on expansion
    ///
    /// # Returns
    /// `true` only for the caller that performed the expansion
    pub fn observe(&self, in_use: usize, gate: &AdmissionGate) -> bool {
        let load_pct = self.load_pct(in_use);
        if load_pct <= self.threshold_pct as usize || in_use != self.base_capacity {
            return false;
        }
        if self
            .expanded
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let total_capacity = gate.expand_by(1);
        warn!(
            load_pct,
            threshold_pct = self.threshold_pct,
            total_capacity,
            "high load, adding reserve capacity"
        );
        true
    }

    /// Whether the one-shot expansion has already happened.
    pub fn expanded(&self) -> bool {
        self.expanded.load(Ordering::Acquire)
    }
}
