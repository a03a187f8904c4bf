/*!
 * Run Queues
 * Per-worker FIFO queues, a global injector and work stealing
 */

use crate::core::limits::GLOBAL_POLL_INTERVAL;
use crate::core::types::{Pid, WorkerId};
use crossbeam_queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static QUEUE_SET_IDS: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// (queue set, worker index) of the worker running on this thread
    static CURRENT_WORKER: Cell<Option<(u64, WorkerId)>> = const { Cell::new(None) };
}

/// Where a popped pid came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Local,
    Injector,
    Stolen,
}

/// Run queues of one runtime
///
/// Each ready process has exactly one entry across all queues. Pushes from a
/// worker thread go to that worker's local queue so a fan-out keeps its
/// order; pushes from any other thread go to the injector.
pub struct RunQueues {
    id: u64,
    injector: SegQueue<Pid>,
    locals: Vec<SegQueue<Pid>>,
    sleep: Mutex<usize>,
    wake: Condvar,
}

impl RunQueues {
    pub fn new(workers: usize) -> Self {
        Self {
            id: QUEUE_SET_IDS.fetch_add(1, Ordering::Relaxed),
            injector: SegQueue::new(),
            locals: (0..workers).map(|_| SegQueue::new()).collect(),
            sleep: Mutex::new(0),
            wake: Condvar::new(),
        }
    }

    /// Bind the calling thread to worker `worker`
    pub fn enter_worker(&self, worker: WorkerId) {
        CURRENT_WORKER.with(|c| c.set(Some((self.id, worker))));
    }

    pub fn leave_worker(&self) {
        CURRENT_WORKER.with(|c| c.set(None));
    }

    fn current_worker(&self) -> Option<WorkerId> {
        CURRENT_WORKER.with(|c| match c.get() {
            Some((set, worker)) if set == self.id && worker < self.locals.len() => Some(worker),
            _ => None,
        })
    }

    pub fn push(&self, pid: Pid) {
        match self.current_worker() {
            Some(worker) => self.locals[worker].push(pid),
            None => self.injector.push(pid),
        }
        self.notify_one();
    }

    /// Next pid for `worker`
    ///
    /// Every `GLOBAL_POLL_INTERVAL` ticks the injector is checked first.
    pub fn pop(&self, worker: WorkerId, tick: u64) -> Option<(Pid, Source)> {
        if tick % GLOBAL_POLL_INTERVAL == 0 {
            if let Some(pid) = self.injector.pop() {
                return Some((pid, Source::Injector));
            }
        }
        if let Some(pid) = self.locals.get(worker).and_then(SegQueue::pop) {
            return Some((pid, Source::Local));
        }
        if let Some(pid) = self.injector.pop() {
            return Some((pid, Source::Injector));
        }
        self.steal(worker).map(|pid| (pid, Source::Stolen))
    }

    fn steal(&self, worker: WorkerId) -> Option<Pid> {
        let n = self.locals.len();
        (1..n)
            .map(|offset| (worker + offset) % n)
            .find_map(|victim| self.locals[victim].pop())
    }

    /// Pop for a non-worker driver (manual mode)
    pub fn pop_any(&self) -> Option<Pid> {
        self.injector
            .pop()
            .or_else(|| self.locals.iter().find_map(SegQueue::pop))
    }

    pub fn len(&self) -> usize {
        self.injector.len() + self.locals.iter().map(SegQueue::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.injector.is_empty() && self.locals.iter().all(SegQueue::is_empty)
    }

    /// Sleep until a push or `timeout`
    pub fn park(&self, timeout: Duration) {
        let mut sleepers = self.sleep.lock();
        if !self.is_empty() {
            return;
        }
        *sleepers += 1;
        self.wake.wait_for(&mut sleepers, timeout);
        *sleepers -= 1;
    }

    fn notify_one(&self) {
        let sleepers = self.sleep.lock();
        if *sleepers > 0 {
            self.wake.notify_one();
        }
    }

    pub fn notify_all(&self) {
        let _sleepers = self.sleep.lock();
        self.wake.notify_all();
    }
}
