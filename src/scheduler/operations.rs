/*!
 * Scheduler Operations
 * Spawn, message delivery and wakeups
 */

use super::Scheduler;
use crate::core::errors::{ProcessError, ProcessResult};
use crate::core::types::{Pid, Ref, SchemaId};
use crate::heap::{copy_counted, ArenaHeap, HeapResult, Term, Value};
use crate::mailbox::{Envelope, MailboxError, MessageKind, Receive};
use crate::process::handler::HandlerRef;
use crate::process::slot::{Body, ProcessSlot};
use crate::process::types::{ExitReason, ProcessInfo, ProcessState, SpawnOptions};
use crate::registry::{PortMessage, Resolved};
use log::{debug, trace};
use std::sync::Arc;

/// Data handed to `spawn` or `deliver`
#[derive(Clone, Copy)]
pub enum Payload<'a> {
    Empty,
    /// A term of a live process heap; deep-copied
    Term(&'a ArenaHeap, Term),
    /// A host value; imported
    Value(&'a Value),
}

impl Payload<'_> {
    /// Write into `dst`; returns the term and the words written
    fn write_into(&self, dst: &mut ArenaHeap) -> HeapResult<(Term, usize)> {
        match self {
            Payload::Empty => Ok((Term::Nil, 0)),
            Payload::Term(src, term) => copy_counted(src, *term, dst).map(|c| (c.term, c.words)),
            Payload::Value(value) => {
                let before = dst.used_bytes();
                let term = dst.import(value)?;
                let words = (dst.used_bytes() - before) / std::mem::size_of::<Term>();
                Ok((term, words))
            }
        }
    }

    fn to_value(&self) -> HeapResult<Value> {
        match self {
            Payload::Empty => Ok(Value::Nil),
            Payload::Term(src, term) => src.export(*term),
            Payload::Value(value) => Ok((*value).clone()),
        }
    }
}

impl Scheduler {
    /// Create a process and make it ready
    ///
    /// Returns the pid and, with `monitor_by`, the monitor reference.
    pub fn spawn_process(
        &self,
        handler: HandlerRef,
        init: Payload<'_>,
        options: SpawnOptions,
    ) -> ProcessResult<(Pid, Option<Ref>)> {
        if let Some(name) = &options.name {
            if self.registry.whereis(name).is_some() {
                return Err(ProcessError::NameTaken(name.clone()));
            }
        }
        if let Some(observer) = options.monitor_by {
            if !self.can_observe(observer) {
                return Err(ProcessError::NoSuchProcess(observer));
            }
        }

        let heap_limit = options.max_heap_bytes.unwrap_or(self.config.max_heap_bytes);
        let mut heap = ArenaHeap::with_limit(heap_limit);
        let (state, _) = init.write_into(&mut heap)?;

        let pid = self.registry.allocate_pid();
        let body = Body {
            heap,
            handler,
            state,
            pattern: Receive::any(),
            started: false,
            resume: false,
            gc_threshold: self.gc_threshold(0, heap_limit),
        };
        let capacity = options.mailbox_capacity.or(self.config.mailbox_capacity);
        let slot = Arc::new(ProcessSlot::new(pid, body, capacity));
        self.registry.insert(Arc::clone(&slot), self.config.max_processes)?;

        if let Some(name) = &options.name {
            if let Err(e) = self.registry.register(name, pid) {
                self.abandon(&slot);
                return Err(e);
            }
        }
        if let Some(peer) = options.link {
            self.link(pid, peer)?;
        }
        let monitor = match options.monitor_by {
            Some(observer) => match self.monitor(observer, pid) {
                Ok(reference) => Some(reference),
                Err(e) => {
                    // Observer died since the check above
                    self.abandon(&slot);
                    return Err(e);
                }
            },
            None => None,
        };

        self.stats.inc_spawns();
        self.queues.push(pid);
        debug!("Spawned {} ({})", pid, slot.handler_name);
        Ok((pid, monitor))
    }

    /// Retire a process that was admitted but never scheduled
    fn abandon(&self, slot: &ProcessSlot) {
        slot.control.lock().state = ProcessState::Dead;
        self.registry.bury(slot.pid, ExitReason::NoProc);
        self.propagate_exit(slot.pid, &ExitReason::NoProc);
    }

    /// Copy a payload to `target` and wake it if it is waiting for it
    ///
    /// Returns the number of words copied.
    pub fn deliver(
        &self,
        target: Pid,
        from: Option<Pid>,
        kind: MessageKind,
        reference: Option<Ref>,
        payload: Payload<'_>,
    ) -> ProcessResult<usize> {
        match self.registry.resolve(target) {
            Resolved::Live(slot) => {
                let mut fragment = ArenaHeap::fragment(slot.heap_limit);
                let (term, words) = payload.write_into(&mut fragment)?;
                self.enqueue(&slot, Envelope::new(from, kind, reference, fragment, term))?;
                Ok(words)
            }
            Resolved::Port(port) => {
                let value = payload.to_value()?;
                port.send(PortMessage {
                    from,
                    kind,
                    reference,
                    value,
                })
                .map_err(|_| ProcessError::NoSuchProcess(target))?;
                Ok(0)
            }
            Resolved::Dead(_) | Resolved::Unknown => Err(ProcessError::NoSuchProcess(target)),
        }
    }

    /// Ordinary user message
    pub fn send(
        &self,
        from: Option<Pid>,
        target: Pid,
        tag: SchemaId,
        reference: Option<Ref>,
        payload: Payload<'_>,
    ) -> ProcessResult<usize> {
        self.deliver(target, from, MessageKind::User(tag), reference, payload)
    }

    /// Deliver an `ExitRequest`; the target decides what to do with it
    pub fn request_exit(
        &self,
        from: Option<Pid>,
        target: Pid,
        reason: ExitReason,
    ) -> ProcessResult<()> {
        self.deliver(
            target,
            from,
            MessageKind::ExitRequest { from, reason },
            None,
            Payload::Empty,
        )
        .map(|_| ())
    }

    /// Append under the control lock; flips Blocked -> Ready on a match
    fn enqueue(&self, slot: &ProcessSlot, envelope: Envelope) -> ProcessResult<()> {
        let wake = {
            let mut control = slot.control.lock();
            if control.state == ProcessState::Dead {
                return Err(ProcessError::NoSuchProcess(slot.pid));
            }

            let wakes = control.state == ProcessState::Blocked
                && control
                    .waiting
                    .as_ref()
                    .map_or(true, |pattern| pattern.matches(&envelope));

            control
                .mailbox
                .enqueue(envelope)
                .map_err(|e| match e {
                    MailboxError::Full { capacity } => ProcessError::MailboxFull {
                        pid: slot.pid,
                        capacity,
                    },
                    other => ProcessError::InvalidOperation(other.to_string()),
                })?;

            if wakes {
                control.transition(slot.pid, ProcessState::Ready)?;
                if let Some(pattern) = control.waiting.take() {
                    if pattern.timeout().is_some() {
                        self.timers.cancel(slot.pid, control.wait_token);
                    }
                }
            }
            wakes
        };

        self.stats.inc_messages();
        if wake {
            trace!("Woke {}", slot.pid);
            self.stats.inc_wakeups();
            self.queues.push(slot.pid);
        }
        Ok(())
    }

    /// Put a running process back in a run queue
    pub(super) fn make_ready(&self, slot: &ProcessSlot) {
        {
            let mut control = slot.control.lock();
            if control.transition(slot.pid, ProcessState::Ready).is_err() {
                return;
            }
        }
        self.queues.push(slot.pid);
    }

    pub fn process_info(&self, pid: Pid) -> Option<ProcessInfo> {
        let slot = self.registry.get(pid)?;
        let (state, mailbox_len, received) = {
            let control = slot.control.lock();
            (
                control.state,
                control.mailbox.len(),
                control.mailbox.received(),
            )
        };
        let heap = slot
            .body
            .try_lock()
            .and_then(|body| body.as_ref().map(|b| b.heap.stats()));

        let name = slot.name.lock().clone();

        Some(ProcessInfo {
            pid,
            name,
            handler: slot.handler_name.clone(),
            state,
            mailbox_len,
            links: self.links.links_of(pid),
            monitored_by: self.links.monitor_count(pid),
            reductions: slot.counters.reductions(),
            quanta: slot.counters.quanta(),
            messages_received: received,
            heap,
        })
    }

    pub fn is_alive(&self, pid: Pid) -> bool {
        self.registry.get(pid).map_or(false, |slot| slot.is_alive())
    }

    pub fn exit_reason(&self, pid: Pid) -> Option<ExitReason> {
        match self.registry.get(pid) {
            Some(slot) => slot.control.lock().exit_reason.clone(),
            None => self.registry.exit_reason(pid),
        }
    }
}
