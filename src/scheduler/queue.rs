//! Shared priority run queue.
//!
//! All workers pull from one min-heap keyed on task priority. The heap and the closed flag are
//! protected by a single mutex, so a push can never slip in after the queue was closed and the
//! workers already saw it drained. A condition variable lets idle workers sleep until a producer
//! pushes work or the dispatcher closes the queue. Waits are always bounded so a worker
//! re-validates both conditions at least once per poll interval, even if a wakeup is missed.

use crate::task::Task;
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Task queued in the shared heap, ordered by priority then insertion sequence.
#[derive(Debug)]
struct QueuedTask {
    /// Copy of the task priority (smaller value = served first)
    priority: i32,
    /// Monotonic insertion counter, breaks ties between equal priorities (FIFO)
    sequence: u64,
    /// The task itself
    task: Task,
}

impl Ord for QueuedTask {
    /// Compare in reverse order to turn the max-heap into a min-heap.
    ///
    /// The smallest priority value rises to the top; among equal priorities the smallest
    /// sequence (oldest insertion) wins.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueuedTask {}

/// Heap, insertion counter and closed flag, all guarded by the same lock.
#[derive(Debug, Default)]
struct QueueInner {
    heap: BinaryHeap<QueuedTask>,
    next_sequence: u64,
    closed: bool,
}

/// Thread-safe priority queue shared by the producer and every worker.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    /// Min-heap of tasks, protected by a mutex for concurrent push/pop
    inner: Mutex<QueueInner>,
    /// Workers wait on this while the heap is empty; push and close notify it
    available: Condvar,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a task into the heap and wake one waiting worker.
    ///
    /// Insertion is O(log n) and happens entirely under the lock, so no reader can observe a
    /// partially inserted task. The closed check happens under the same lock.
    ///
    /// # Arguments
    /// * `task` - The task to enqueue
    ///
    /// # Returns
    /// `Err(task)` handing the task back if the queue has been closed
    pub fn push(&self, task: Task) -> Result<(), Task> {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(task);
            }
            let sequence = inner.next_sequence;
            inner.next_sequence += 1;
            inner.heap.push(QueuedTask {
                priority: task.priority(),
                sequence,
                task,
            });
        }
        self.available.notify_one();
        Ok(())
    }

    /// Pop the highest-priority task without blocking.
    ///
    /// # Returns
    /// `Some(task)` with the smallest priority value, or `None` if the queue is empty
    pub fn try_pop(&self) -> Option<Task> {
        self.inner.lock().heap.pop().map(|queued| queued.task)
    }

    /// Point-in-time emptiness check. The answer may be stale as soon as it is returned.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().heap.is_empty()
    }

    /// Point-in-time number of queued tasks.
    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    /// Refuse further pushes and wake every waiting worker.
    ///
    /// # Returns
    /// `true` for the call that closed the queue, `false` if it was already closed
    pub fn close(&self) -> bool {
        let first = {
            let mut inner = self.inner.lock();
            !std::mem::replace(&mut inner.closed, true)
        };
        self.available.notify_all();
        first
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Closed and empty, observed atomically: no task can be queued after this returns `true`.
    pub fn is_drained(&self) -> bool {
        let inner = self.inner.lock();
        inner.closed && inner.heap.is_empty()
    }

    /// Block until work is queued, the queue is closed, or `timeout` elapses.
    ///
    /// Spurious wakeups are absorbed: after every wake the heap and the closed flag are
    /// checked again under the lock.
    ///
    /// # Arguments
    /// * `timeout` - Upper bound on the wait (the worker poll interval)
    ///
    /// # Returns
    /// `true` if the queue held at least one task when the wait ended, `false` otherwise
    /// (closed with an empty queue, or the timeout expired with nothing to do)
    pub fn wait_for_work(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if !inner.heap.is_empty() {
                return true;
            }
            if inner.closed {
                return false;
            }
            if self.available.wait_until(&mut inner, deadline).timed_out() {
                return !inner.heap.is_empty();
            }
        }
    }
}
