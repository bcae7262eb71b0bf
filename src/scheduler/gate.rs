//! Counting admission gate with a capacity that can grow at runtime.
//!
//! The gate is the scheduler's backpressure point: a worker must be admitted before it may take
//! a task from the queue, and at most `total_capacity` workers can be admitted at once. Unlike a
//! fixed semaphore, the capacity can be raised while workers are blocked in [`acquire`], which
//! is how the load monitor adds reserve capacity.
//!
//! Workers hold their slot through an [`Admission`] guard, so the slot goes back to the gate
//! even when the task executor panics and unwinds the worker thread.
//!
//! [`acquire`]: AdmissionGate::acquire

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct GateState {
    /// Admissions currently held
    in_use: usize,
    /// Current ceiling (base capacity plus any expansion)
    total_capacity: usize,
    /// Highest `in_use` value observed since creation
    peak_in_use: usize,
}

/// Bounded-concurrency gate shared by all workers.
#[derive(Debug)]
pub struct AdmissionGate {
    base_capacity: usize,
    state: Mutex<GateState>,
    /// Signalled whenever an admission is released or the capacity grows
    released: Condvar,
}

impl AdmissionGate {
    /// Create a gate admitting `base_capacity` holders at once.
    ///
    /// # Panics
    /// Panics if `base_capacity` is zero: such a gate could never admit anyone.
    pub fn new(base_capacity: usize) -> Self {
        assert!(base_capacity > 0, "admission gate needs a non-zero capacity");
        Self {
            base_capacity,
            state: Mutex::new(GateState {
                in_use: 0,
                total_capacity: base_capacity,
                peak_in_use: 0,
            }),
            released: Condvar::new(),
        }
    }

    /// Block until an admission slot is free, then take it.
    ///
    /// The capacity check and the increment happen in the same critical section, so the value
    /// returned is the exact occupancy at the instant of admission. The load monitor relies on
    /// this to make its threshold decision linearizable.
    ///
    /// # Returns
    /// Number of admissions held right after this one was granted (including it)
    pub fn acquire(&self) -> usize {
        let mut state = self.state.lock();
        while state.in_use >= state.total_capacity {
            self.released.wait(&mut state);
        }
        Self::grant(&mut state)
    }

    /// Blocking [`acquire`](Self::acquire) that returns a guard releasing the slot on drop.
    pub fn admit(&self) -> Admission<'_> {
        let in_use = self.acquire();
        Admission { gate: self, in_use }
    }

    /// Take an admission slot if one is free, without blocking.
    pub fn try_acquire(&self) -> Option<usize> {
        let mut state = self.state.lock();
        if state.in_use >= state.total_capacity {
            return None;
        }
        Some(Self::grant(&mut state))
    }

    fn grant(state: &mut GateState) -> usize {
        state.in_use += 1;
        assert!(
            state.in_use <= state.total_capacity,
            "admission gate over capacity: {} > {}",
            state.in_use,
            state.total_capacity
        );
        state.peak_in_use = state.peak_in_use.max(state.in_use);
        state.in_use
    }

    /// Give back an admission slot and wake one blocked acquirer.
    ///
    /// # Panics
    /// Panics if no admission is currently held. An unmatched release would silently inflate
    /// the capacity, so it is treated as a synchronization bug rather than tolerated.
    pub fn release(&self) {
        {
            let mut state = self.state.lock();
            assert!(
                state.in_use > 0,
                "AdmissionGate::release called without a matching acquire"
            );
            state.in_use -= 1;
        }
        self.released.notify_one();
    }

    /// Raise the capacity by `additional` slots and wake blocked acquirers.
    ///
    /// Never waits on other holders; concurrent calls all take effect.
    ///
    /// # Returns
    /// The new total capacity
    pub fn expand_by(&self, additional: usize) -> usize {
        let total = {
            let mut state = self.state.lock();
            state.total_capacity += additional;
            state.total_capacity
        };
        self.released.notify_all();
        total
    }

    pub fn base_capacity(&self) -> usize {
        self.base_capacity
    }

    pub fn total_capacity(&self) -> usize {
        self.state.lock().total_capacity
    }

    pub fn in_use(&self) -> usize {
        self.state.lock().in_use
    }

    /// Highest number of simultaneous admissions seen so far.
    pub fn peak_in_use(&self) -> usize {
        self.state.lock().peak_in_use
    }
}

/// An admission slot held on an [`AdmissionGate`]; dropping it releases the slot.
#[derive(Debug)]
#[must_use = "dropping the admission releases the slot immediately"]
pub struct Admission<'a> {
    gate: &'a AdmissionGate,
    in_use: usize,
}

impl Admission<'_> {
    /// Occupancy observed when this slot was granted (including it).
    pub fn in_use(&self) -> usize {
        self.in_use
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn acquire_and_release_track_occupancy() {
        let gate = AdmissionGate::new(2);
        assert_eq!(gate.acquire(), 1);
        assert_eq!(gate.acquire(), 2);
        assert_eq!(gate.in_use(), 2);
        assert!(gate.try_acquire().is_none());

        gate.release();
        assert_eq!(gate.in_use(), 1);
        assert_eq!(gate.try_acquire(), Some(2));
        assert_eq!(gate.peak_in_use(), 2);
    }

    #[test]
    fn admission_guard_releases_on_drop() {
        let gate = AdmissionGate::new(2);
        {
            let first = gate.admit();
            let second = gate.admit();
            assert_eq!((first.in_use(), second.in_use()), (1, 2));
            assert!(gate.try_acquire().is_none());
        }
        assert_eq!(gate.in_use(), 0);
        assert_eq!(gate.peak_in_use(), 2);
    }

    #[test]
    fn admission_is_released_when_its_holder_panics() {
        let gate = Arc::new(AdmissionGate::new(1));
        let holder = {
            let gate = gate.clone();
            thread::spawn(move || {
                let _admission = gate.admit();
                panic!("holder died while admitted");
            })
        };
        assert!(holder.join().is_err());
        assert_eq!(gate.in_use(), 0);
        assert_eq!(gate.try_acquire(), Some(1));
    }

    #[test]
    #[should_panic(expected = "without a matching acquire")]
    fn release_without_acquire_panics() {
        let gate = AdmissionGate::new(1);
        gate.release();
    }

    #[test]
    #[should_panic(expected = "without a matching acquire")]
    fn double_release_panics() {
        let gate = AdmissionGate::new(3);
        gate.acquire();
        gate.release();
        gate.release();
    }

    #[test]
    fn blocked_acquire_resumes_after_release() {
        let gate = Arc::new(AdmissionGate::new(1));
        gate.acquire();

        let admitted = Arc::new(AtomicBool::new(false));
        let waiter = {
            let gate = gate.clone();
            let admitted = admitted.clone();
            thread::spawn(move || {
                gate.acquire();
                admitted.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(30));
        assert!(!admitted.load(Ordering::SeqCst));

        gate.release();
        waiter.join().unwrap();
        assert!(admitted.load(Ordering::SeqCst));
        assert_eq!(gate.in_use(), 1);
    }

    #[test]
    fn expansion_unblocks_waiting_acquirer() {
        let gate = Arc::new(AdmissionGate::new(1));
        gate.acquire();

        let waiter = {
            let gate = gate.clone();
            thread::spawn(move || gate.acquire())
        };
        thread::sleep(Duration::from_millis(20));

        assert_eq!(gate.expand_by(1), 2);
        assert_eq!(waiter.join().unwrap(), 2);
        assert_eq!(gate.total_capacity(), 2);
        assert_eq!(gate.base_capacity(), 1);
    }

    #[test]
    fn concurrent_expansions_are_not_lost() {
        let gate = Arc::new(AdmissionGate::new(1));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                thread::spawn(move || gate.expand_by(1))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(gate.total_capacity(), 9);
    }

    #[test]
    fn occupancy_never_exceeds_capacity_under_stress() {
        let gate = Arc::new(AdmissionGate::new(3));
        let handles: Vec<_> = (0..12)
            .map(|_| {
                let gate = gate.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let in_use = gate.acquire();
                        assert!(in_use <= gate.total_capacity());
                        thread::yield_now();
                        gate.release();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(gate.in_use(), 0);
        assert!(gate.peak_in_use() <= 3);
    }
}
