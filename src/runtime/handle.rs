/*!
 * Runtime Handle
 * Host-facing operations on a running scheduler
 */

use crate::core::config::RuntimeConfig;
use crate::core::errors::ProcessResult;
use crate::core::types::{Pid, Ref, SchemaId};
use crate::heap::Value;
use crate::process::handler::HandlerRef;
use crate::process::types::{ExitReason, ProcessInfo, SpawnOptions};
use crate::scheduler::{Payload, QuantumOutcome, RuntimeStats, Scheduler};

/// Cloneable handle to a runtime
///
/// Every operation here acts on behalf of the host, which has no pid of its
/// own: messages it sends carry no sender. Use a [`Port`](super::Port) when
/// the host needs to receive.
#[derive(Clone)]
pub struct RuntimeHandle {
    scheduler: Scheduler,
}

impl RuntimeHandle {
    pub(crate) fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        self.scheduler.config()
    }

    /// Spawn a process with a copy of `initial_state`
    pub fn spawn(
        &self,
        handler: HandlerRef,
        initial_state: &Value,
        options: SpawnOptions,
    ) -> ProcessResult<Pid> {
        self.scheduler
            .spawn_process(handler, Payload::Value(initial_state), options)
            .map(|(pid, _)| pid)
    }

    /// Spawn and monitor from `observer` in one step
    pub fn spawn_monitor(
        &self,
        handler: HandlerRef,
        initial_state: &Value,
        observer: Pid,
    ) -> ProcessResult<(Pid, Ref)> {
        let options = SpawnOptions::new().monitor_by(observer);
        let (pid, reference) =
            self.scheduler
                .spawn_process(handler, Payload::Value(initial_state), options)?;
        match reference {
            Some(reference) => Ok((pid, reference)),
            None => Ok((pid, self.scheduler.monitor(observer, pid)?)),
        }
    }

    /// Send a user message; `NoSuchProcess` if `target` is dead or unknown
    pub fn send(&self, target: Pid, tag: SchemaId, payload: &Value) -> ProcessResult<()> {
        self.scheduler
            .send(None, target, tag, None, Payload::Value(payload))
            .map(|_| ())
    }

    pub fn link(&self, a: Pid, b: Pid) -> ProcessResult<()> {
        self.scheduler.link(a, b)
    }

    pub fn unlink(&self, a: Pid, b: Pid) {
        self.scheduler.unlink(a, b)
    }

    pub fn monitor(&self, observer: Pid, target: Pid) -> ProcessResult<Ref> {
        self.scheduler.monitor(observer, target)
    }

    pub fn demonitor(&self, reference: Ref) -> bool {
        self.scheduler.demonitor(reference)
    }

    /// Ask `target` to exit; the process decides how to react
    pub fn request_exit(&self, target: Pid, reason: ExitReason) -> ProcessResult<()> {
        self.scheduler.request_exit(None, target, reason)
    }

    pub fn register(&self, name: &str, pid: Pid) -> ProcessResult<()> {
        self.scheduler.registry().register(name, pid)
    }

    pub fn unregister(&self, name: &str) -> Option<Pid> {
        self.scheduler.registry().unregister(name)
    }

    pub fn whereis(&self, name: &str) -> Option<Pid> {
        self.scheduler.registry().whereis(name)
    }

    pub fn process_info(&self, pid: Pid) -> Option<ProcessInfo> {
        self.scheduler.process_info(pid)
    }

    pub fn exit_reason(&self, pid: Pid) -> Option<ExitReason> {
        self.scheduler.exit_reason(pid)
    }

    pub fn is_alive(&self, pid: Pid) -> bool {
        self.scheduler.is_alive(pid)
    }

    pub fn process_count(&self) -> usize {
        self.scheduler.registry().live_count()
    }

    pub fn pids(&self) -> Vec<Pid> {
        self.scheduler.registry().pids()
    }

    pub fn stats(&self) -> RuntimeStats {
        self.scheduler.stats()
    }

    /// Run one quantum of `pid` on the calling thread
    pub fn run_quantum(&self, pid: Pid) -> QuantumOutcome {
        self.scheduler.run_quantum(pid)
    }

    /// Drive the scheduler on the calling thread; see [`Scheduler::run_until_idle`]
    pub fn run_until_idle(&self, max_quanta: usize) -> usize {
        self.scheduler.run_until_idle(max_quanta)
    }
}
