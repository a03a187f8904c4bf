/*!
 * Quantum Execution
 * Runs one process for one reduction budget and applies the outcome
 */

use super::types::QuantumOutcome;
use super::Scheduler;
use crate::core::errors::panic_message;
use crate::core::limits::{GC_GROWTH_FACTOR, RECEIVE_COST};
use crate::core::types::{Pid, Reductions};
use crate::heap::{copy_counted, HeapError};
use crate::mailbox::{MailboxError, Receive};
use crate::process::context::{copy_cost, Context};
use crate::process::handler::{Delivery, Message, Next};
use crate::process::slot::{Body, ProcessSlot};
use crate::process::types::{ExitReason, ProcessState};
use log::{debug, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// How the handler loop ended
enum Step {
    Preempted,
    Yielded,
    Blocked,
    Exit(ExitReason),
}

impl Scheduler {
    /// Run `pid` for at most one budget of reductions
    ///
    /// Stale queue entries (dead, unknown or not ready) return
    /// `NotRunnable` without side effects.
    pub fn run_quantum(&self, pid: Pid) -> QuantumOutcome {
        let Some(slot) = self.registry.get(pid) else {
            return QuantumOutcome::NotRunnable;
        };

        {
            let mut control = slot.control.lock();
            if control.state != ProcessState::Ready {
                return QuantumOutcome::NotRunnable;
            }
            control.state = ProcessState::Running;
        }

        let Some(mut guard) = slot.body.try_lock() else {
            // Body still held by a worker finishing the previous quantum
            self.make_ready(&slot);
            return QuantumOutcome::NotRunnable;
        };

        self.stats.inc_quanta();
        slot.counters.inc_quanta();

        let allowance = Reductions::from(self.config.reductions_per_quantum);
        let mut budget = allowance;

        let step = match guard.as_mut() {
            Some(body) => self.execute(&slot, body, &mut budget),
            None => Step::Exit(ExitReason::NoProc),
        };

        let spent = (allowance - budget).max(0) as u64;
        slot.counters.add_reductions(spent);
        self.stats.add_reductions(spent);

        match step {
            Step::Preempted => {
                self.stats.inc_preemptions();
                self.make_ready(&slot);
                QuantumOutcome::Preempted
            }
            Step::Yielded => {
                self.stats.inc_yields();
                self.make_ready(&slot);
                QuantumOutcome::Yielded
            }
            Step::Blocked => {
                self.stats.inc_blocks();
                QuantumOutcome::Blocked
            }
            Step::Exit(reason) => {
                let body = guard.take();
                drop(guard);
                self.terminate(&slot, body, reason)
            }
        }
    }

    /// Handler loop; runs until the budget is spent or the process stops
    fn execute(&self, slot: &ProcessSlot, body: &mut Body, budget: &mut Reductions) -> Step {
        loop {
            if *budget <= 0 {
                return Step::Preempted;
            }

            let delivery = match self.next_delivery(slot, body, budget) {
                Ok(Some(delivery)) => delivery,
                Ok(None) => return Step::Blocked,
                Err(reason) => return Step::Exit(reason),
            };

            let handler = Arc::clone(&body.handler);
            let state = body.state;
            let result = {
                let mut ctx = Context::new(self, slot.pid, &mut body.heap, budget);
                catch_unwind(AssertUnwindSafe(|| {
                    handler.handle(&mut ctx, state, delivery)
                }))
            };

            let next = match result {
                Ok(Ok(next)) => next,
                Ok(Err(fault)) => return Step::Exit(fault.into()),
                Err(panic) => {
                    return Step::Exit(ExitReason::Fault(format!(
                        "handler panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                }
            };

            let (state, pattern, yielded) = match next {
                Next::Continue(state) => (state, Receive::any(), false),
                Next::Receive { state, pattern } => (state, pattern, false),
                Next::Yield(state) => (state, body.pattern.clone(), true),
                Next::Exit(reason) => return Step::Exit(reason),
            };

            if let Err(e) = body.heap.check_term(state) {
                return Step::Exit(ExitReason::Fault(format!(
                    "handler returned state outside its heap: {e}"
                )));
            }
            body.state = state;
            body.pattern = pattern;

            if let Err(reason) = self.maybe_collect(slot.pid, body, budget) {
                return Step::Exit(reason);
            }

            if yielded {
                body.resume = true;
                return Step::Yielded;
            }
        }
    }

    /// Pick the next delivery, or block on the current pattern
    fn next_delivery(
        &self,
        slot: &ProcessSlot,
        body: &mut Body,
        budget: &mut Reductions,
    ) -> Result<Option<Delivery>, ExitReason> {
        if !body.started {
            body.started = true;
            return Ok(Some(Delivery::Start));
        }
        if body.resume {
            body.resume = false;
            return Ok(Some(Delivery::Resume));
        }

        let envelope = {
            let mut control = slot.control.lock();
            if control.timed_out {
                control.timed_out = false;
                return Ok(Some(Delivery::Timeout));
            }

            match control.mailbox.receive(&body.pattern) {
                Ok(envelope) => envelope,
                Err(MailboxError::PatternPanicked(message)) => {
                    return Err(ExitReason::Fault(format!(
                        "receive pattern panicked: {message}"
                    )))
                }
                Err(_) => {
                    control.state = ProcessState::Blocked;
                    control.wait_token += 1;
                    control.waiting = Some(body.pattern.clone());
                    if let Some(timeout) = body.pattern.timeout() {
                        self.timers
                            .schedule(Instant::now() + timeout, slot.pid, control.wait_token);
                    }
                    return Ok(None);
                }
            }
        };

        *budget -= RECEIVE_COST;
        let (kind, from, reference, fragment, payload) = envelope.into_parts();
        let copied = match copy_counted(&fragment, payload, &mut body.heap) {
            Ok(copied) => copied,
            Err(HeapError::OutOfMemory { .. }) => {
                // Garbage may be all that stands in the way
                self.collect(slot.pid, body, budget)?;
                copy_counted(&fragment, payload, &mut body.heap)
                    .map_err(|e| ExitReason::Fault(format!("cannot receive message: {e}")))?
            }
            Err(e) => return Err(ExitReason::Fault(format!("cannot receive message: {e}"))),
        };
        *budget -= copy_cost(copied.words);

        Ok(Some(Delivery::Message(Message {
            kind,
            from,
            reference,
            payload: copied.term,
        })))
    }

    /// Collection threshold for a heap with `live` bytes under `limit`
    ///
    /// Never above half the limit, so garbage alone cannot exhaust a heap.
    pub(super) fn gc_threshold(&self, live: usize, limit: usize) -> usize {
        self.config
            .gc_min_threshold
            .max(live.saturating_mul(GC_GROWTH_FACTOR))
            .min(limit / 2)
    }

    /// Collect the heap once it outgrows its threshold
    fn maybe_collect(
        &self,
        pid: Pid,
        body: &mut Body,
        budget: &mut Reductions,
    ) -> Result<(), ExitReason> {
        if body.heap.used_bytes() <= body.gc_threshold {
            return Ok(());
        }
        self.collect(pid, body, budget)
    }

    /// Collect with the state as the only root
    fn collect(&self, pid: Pid, body: &mut Body, budget: &mut Reductions) -> Result<(), ExitReason> {
        let mut roots = [body.state];
        let stats = body
            .heap
            .collect(&mut roots)
            .map_err(|e| ExitReason::Fault(format!("collection failed: {e}")))?;
        body.state = roots[0];

        body.gc_threshold = self.gc_threshold(stats.after_bytes, body.heap.limit());
        *budget -= copy_cost(stats.copied_words);

        self.stats.inc_collections();
        self.stats.add_reclaimed(stats.reclaimed_bytes() as u64);
        debug!(
            "Collected {}: reclaimed {} bytes, next threshold {}",
            pid,
            stats.reclaimed_bytes(),
            body.gc_threshold
        );
        Ok(())
    }

    /// Dead, drained, tombstoned, released, then peers notified
    fn terminate(
        &self,
        slot: &ProcessSlot,
        body: Option<Body>,
        reason: ExitReason,
    ) -> QuantumOutcome {
        let drained = {
            let mut control = slot.control.lock();
            control.state = ProcessState::Dead;
            control.exit_reason = Some(reason.clone());
            control.waiting = None;
            control.mailbox.drain()
        };
        drop(drained);

        self.registry.bury(slot.pid, reason.clone());

        if let Some(mut body) = body {
            let released = body.heap.release_all();
            self.stats.add_reclaimed(released.bytes as u64);
        }

        self.stats.inc_exits();
        if reason.is_fault() {
            self.stats.inc_faults();
            warn!("Process {} ({}) crashed: {}", slot.pid, slot.handler_name, reason);
        } else {
            debug!("Process {} exited: {}", slot.pid, reason);
        }

        self.propagate_exit(slot.pid, &reason);
        QuantumOutcome::Exited(reason)
    }
}
