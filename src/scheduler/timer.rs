/*!
 * Receive Timers
 * Deadline heap for receive timeouts
 */

use crate::core::types::Pid;
use ahash::RandomState;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::time::Instant;

/// Cancelled entries tolerated before the heap is compacted
const COMPACT_MIN: usize = 64;

type Entry = Reverse<(Instant, Pid, u64)>;

#[derive(Default)]
struct Timers {
    heap: BinaryHeap<Entry>,
    cancelled: HashSet<(Pid, u64), RandomState>,
}

/// Pending receive timeouts
///
/// Each entry carries the wait token of the block it was armed for and is
/// ignored on expiry if the process has moved on. Timers disarmed by a
/// message are marked cancelled and swept out once they dominate the heap.
#[derive(Default)]
pub struct TimerQueue {
    inner: Mutex<Timers>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, deadline: Instant, pid: Pid, token: u64) {
        self.inner.lock().heap.push(Reverse((deadline, pid, token)));
    }

    /// Disarm the timer armed for `pid`'s block `token`
    pub fn cancel(&self, pid: Pid, token: u64) {
        let mut inner = self.inner.lock();
        inner.cancelled.insert((pid, token));

        if inner.cancelled.len() >= COMPACT_MIN && inner.cancelled.len() * 2 >= inner.heap.len() {
            let Timers { heap, cancelled } = &mut *inner;
            heap.retain(|Reverse((_, pid, token))| !cancelled.contains(&(*pid, *token)));
            cancelled.clear();
        }
    }

    /// Remove and return every live timer due at `now`
    pub fn pop_expired(&self, now: Instant) -> Vec<(Pid, u64)> {
        let mut inner = self.inner.lock();
        let mut due = Vec::new();
        while let Some(Reverse((deadline, pid, token))) = inner.heap.peek().copied() {
            if deadline > now {
                break;
            }
            inner.heap.pop();
            if !inner.cancelled.remove(&(pid, token)) {
                due.push((pid, token));
            }
        }
        due
    }

    /// Earliest deadline; may belong to a cancelled timer
    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner
            .lock()
            .heap
            .peek()
            .map(|Reverse((deadline, _, _))| *deadline)
    }

    /// Armed timers, cancelled ones excluded
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.heap.len().saturating_sub(inner.cancelled.len())
    }

    /// Entries held, cancelled ones included
    pub fn capacity_used(&self) -> usize {
        self.inner.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
