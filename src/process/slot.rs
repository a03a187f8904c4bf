/*!
 * Process Slot
 * Control block and execution body of one process
 */

use super::handler::HandlerRef;
use super::types::{ExitReason, ProcessState};
use crate::core::errors::ProcessError;
use crate::core::types::Pid;
use crate::heap::{ArenaHeap, Term};
use crate::mailbox::{Mailbox, Receive};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// State that senders and timers touch
///
/// State, mailbox and wait pattern share one lock so that a receive miss and
/// a concurrent enqueue can never both conclude the other will wake the
/// process.
#[derive(Debug)]
pub struct Control {
    pub state: ProcessState,
    pub mailbox: Mailbox,
    /// Pattern the process is blocked on
    pub waiting: Option<Receive>,
    /// Bumped on every block; stale timers carry an old token
    pub wait_token: u64,
    pub timed_out: bool,
    pub exit_reason: Option<ExitReason>,
}

impl Control {
    /// Validated state change
    pub fn transition(&mut self, pid: Pid, to: ProcessState) -> Result<(), ProcessError> {
        if !self.state.can_transition_to(to) {
            return Err(ProcessError::InvalidStateTransition {
                pid,
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

/// State only the running worker touches
pub struct Body {
    pub heap: ArenaHeap,
    pub handler: HandlerRef,
    pub state: Term,
    pub pattern: Receive,
    pub started: bool,
    pub resume: bool,
    pub gc_threshold: usize,
}

/// Per-process counters (lock-free)
#[derive(Debug, Default)]
pub struct ProcessCounters {
    reductions: AtomicU64,
    quanta: AtomicU64,
}

impl ProcessCounters {
    #[inline(always)]
    pub fn add_reductions(&self, n: u64) {
        self.reductions.fetch_add(n, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_quanta(&self) {
        self.quanta.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn reductions(&self) -> u64 {
        self.reductions.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn quanta(&self) -> u64 {
        self.quanta.load(Ordering::Relaxed)
    }
}

/// Registry entry for one process
pub struct ProcessSlot {
    pub pid: Pid,
    pub handler_name: String,
    /// Heap limit, also applied to message fragments bound for this process
    pub heap_limit: usize,
    pub control: Mutex<Control>,
    /// `None` once the process is dead and its heap released
    pub body: Mutex<Option<Body>>,
    pub name: Mutex<Option<String>>,
    pub counters: ProcessCounters,
}

impl ProcessSlot {
    pub fn new(pid: Pid, body: Body, mailbox_capacity: Option<usize>) -> Self {
        Self {
            pid,
            handler_name: body.handler.name().to_string(),
            heap_limit: body.heap.limit(),
            control: Mutex::new(Control {
                state: ProcessState::Ready,
                mailbox: Mailbox::with_capacity(pid, mailbox_capacity),
                waiting: None,
                wait_token: 0,
                timed_out: false,
                exit_reason: None,
            }),
            body: Mutex::new(Some(body)),
            name: Mutex::new(None),
            counters: ProcessCounters::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> ProcessState {
        self.control.lock().state
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.state().is_alive()
    }
}

impl std::fmt::Debug for ProcessSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSlot")
            .field("pid", &self.pid)
            .field("handler", &self.handler_name)
            .finish()
    }
}
