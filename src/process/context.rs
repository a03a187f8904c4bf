/*!
 * Handler Context
 * Runtime operations available to a running process
 */

use super::handler::HandlerRef;
use super::types::{ExitReason, SpawnOptions};
use crate::core::errors::ProcessResult;
use crate::core::limits::{COPY_WORDS_PER_REDUCTION, LINK_COST, SEND_COST, SPAWN_COST};
use crate::core::types::{Pid, Reductions, Ref, SchemaId};
use crate::heap::{ArenaHeap, Term, Value};
use crate::scheduler::{Payload, Scheduler};

/// Reductions charged for copying `words` words
#[inline]
pub(crate) fn copy_cost(words: usize) -> Reductions {
    (words / COPY_WORDS_PER_REDUCTION) as Reductions
}

/// Context of one handler invocation
///
/// Every operation charges the process's reduction budget. Sends to dead or
/// unknown processes fail with `NoSuchProcess` and never take the caller
/// down.
pub struct Context<'a> {
    scheduler: &'a Scheduler,
    pid: Pid,
    heap: &'a mut ArenaHeap,
    budget: &'a mut Reductions,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        scheduler: &'a Scheduler,
        pid: Pid,
        heap: &'a mut ArenaHeap,
        budget: &'a mut Reductions,
    ) -> Self {
        Self {
            scheduler,
            pid,
            heap,
            budget,
        }
    }

    #[inline]
    pub fn self_pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn heap(&self) -> &ArenaHeap {
        &*self.heap
    }

    #[inline]
    pub fn heap_mut(&mut self) -> &mut ArenaHeap {
        &mut *self.heap
    }

    /// Charge `n` reductions for handler-side work (loops, calls)
    #[inline]
    pub fn consume(&mut self, n: Reductions) {
        *self.budget -= n;
    }

    #[inline]
    pub fn reductions_left(&self) -> Reductions {
        *self.budget
    }

    /// True once the budget is spent; a good point to `Next::Yield`
    #[inline]
    pub fn should_yield(&self) -> bool {
        *self.budget <= 0
    }

    /// Deep-copy `payload` to `to`
    pub fn send(&mut self, to: Pid, tag: SchemaId, payload: Term) -> ProcessResult<()> {
        self.consume(SEND_COST);
        let words = self.scheduler.send(
            Some(self.pid),
            to,
            tag,
            None,
            Payload::Term(&*self.heap, payload),
        )?;
        self.consume(copy_cost(words));
        Ok(())
    }

    /// Send a host-built value
    pub fn send_value(&mut self, to: Pid, tag: SchemaId, value: &Value) -> ProcessResult<()> {
        self.consume(SEND_COST);
        let words = self
            .scheduler
            .send(Some(self.pid), to, tag, None, Payload::Value(value))?;
        self.consume(copy_cost(words));
        Ok(())
    }

    /// Answer a request carrying `reference`
    pub fn reply(&mut self, to: Pid, reference: Ref, payload: Term) -> ProcessResult<()> {
        self.consume(SEND_COST);
        let words = self.scheduler.send(
            Some(self.pid),
            to,
            SchemaId::UNTYPED,
            Some(reference),
            Payload::Term(&*self.heap, payload),
        )?;
        self.consume(copy_cost(words));
        Ok(())
    }

    /// Spawn a process whose initial state is a copy of `init`
    pub fn spawn(
        &mut self,
        handler: HandlerRef,
        init: Term,
        options: SpawnOptions,
    ) -> ProcessResult<Pid> {
        self.consume(SPAWN_COST);
        let (pid, _) =
            self.scheduler
                .spawn_process(handler, Payload::Term(&*self.heap, init), options)?;
        Ok(pid)
    }

    /// Spawn linked to the caller
    pub fn spawn_link(&mut self, handler: HandlerRef, init: Term) -> ProcessResult<Pid> {
        let options = SpawnOptions::new().link(self.pid);
        self.spawn(handler, init, options)
    }

    /// Spawn monitored by the caller
    pub fn spawn_monitor(&mut self, handler: HandlerRef, init: Term) -> ProcessResult<(Pid, Ref)> {
        self.consume(SPAWN_COST + LINK_COST);
        let options = SpawnOptions::new().monitor_by(self.pid);
        let (pid, reference) =
            self.scheduler
                .spawn_process(handler, Payload::Term(&*self.heap, init), options)?;
        match reference {
            Some(reference) => Ok((pid, reference)),
            None => Ok((pid, self.scheduler.monitor(self.pid, pid)?)),
        }
    }

    pub fn link(&mut self, peer: Pid) -> ProcessResult<()> {
        self.consume(LINK_COST);
        self.scheduler.link(self.pid, peer)
    }

    pub fn unlink(&mut self, peer: Pid) {
        self.consume(LINK_COST);
        self.scheduler.unlink(self.pid, peer);
    }

    pub fn monitor(&mut self, target: Pid) -> ProcessResult<Ref> {
        self.consume(LINK_COST);
        self.scheduler.monitor(self.pid, target)
    }

    pub fn demonitor(&mut self, reference: Ref) -> bool {
        self.consume(LINK_COST);
        self.scheduler.demonitor(reference)
    }

    #[inline]
    pub fn make_ref(&self) -> Ref {
        self.scheduler.make_ref()
    }

    /// Ask `target` to exit; delivered as an ordinary `ExitRequest`
    pub fn request_exit(&mut self, target: Pid, reason: ExitReason) -> ProcessResult<()> {
        self.consume(SEND_COST);
        self.scheduler.request_exit(Some(self.pid), target, reason)
    }

    pub fn register(&mut self, name: &str) -> ProcessResult<()> {
        self.scheduler.registry().register(name, self.pid)
    }

    pub fn whereis(&self, name: &str) -> Option<Pid> {
        self.scheduler.registry().whereis(name)
    }

    /// Allocate a host value in this process's heap
    pub fn import(&mut self, value: &Value) -> ProcessResult<Term> {
        Ok(self.heap.import(value)?)
    }
}
