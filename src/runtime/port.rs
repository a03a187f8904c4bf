/*!
 * Host Ports
 * Host-side mailboxes for replies, exit notices and synchronous calls
 */

use super::RuntimeHandle;
use crate::core::errors::{CallError, ProcessResult};
use crate::core::types::{Pid, Ref, SchemaId};
use crate::heap::Value;
use crate::mailbox::MessageKind;
use crate::process::types::ExitReason;
use crate::registry::PortMessage;
use crate::scheduler::Payload;
use flume::{Receiver, RecvTimeoutError};
use log::trace;
use std::time::{Duration, Instant};

/// A pid the host can receive on
///
/// Processes see it as an ordinary pid: they can send to it, reply to it and
/// it can monitor them. It is never scheduled and cannot be linked. Closed
/// on drop.
pub struct Port {
    handle: RuntimeHandle,
    pid: Pid,
    rx: Receiver<PortMessage>,
}

impl Port {
    pub(super) fn open(handle: &RuntimeHandle) -> Self {
        let (pid, rx) = handle.scheduler().registry().open_port();
        trace!("Opened port {}", pid);
        Self {
            handle: handle.clone(),
            pid,
            rx,
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Monitor `target`; its `Down` arrives on this port
    pub fn monitor(&self, target: Pid) -> ProcessResult<Ref> {
        self.handle.scheduler().monitor(self.pid, target)
    }

    pub fn try_recv(&self) -> Option<PortMessage> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<PortMessage> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub async fn recv_async(&self) -> Option<PortMessage> {
        self.rx.recv_async().await.ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Drop for Port {
    fn drop(&mut self) {
        self.handle.scheduler().registry().close_port(self.pid);
    }
}

/// An outstanding request: reply port, correlation ref and target monitor
struct PendingCall {
    port: Port,
    target: Pid,
    reference: Ref,
    monitor: Ref,
}

impl PendingCall {
    fn start(
        handle: &RuntimeHandle,
        target: Pid,
        tag: SchemaId,
        request: &Value,
    ) -> Result<Self, CallError> {
        let port = Port::open(handle);
        let monitor = handle.scheduler().monitor(port.pid, target)?;
        let reference = handle.scheduler().make_ref();
        let pending = Self {
            port,
            target,
            reference,
            monitor,
        };

        handle.scheduler().send(
            Some(pending.port.pid),
            target,
            tag,
            Some(reference),
            Payload::Value(request),
        )?;
        Ok(pending)
    }

    /// `Some` once `message` settles the call
    fn accept(&self, message: PortMessage) -> Option<Result<Value, CallError>> {
        match message.kind {
            MessageKind::User(_) if message.reference == Some(self.reference) => {
                Some(Ok(message.value))
            }
            MessageKind::Down {
                reference,
                from,
                reason,
            } if reference == self.monitor => Some(Err(match reason {
                ExitReason::NoProc => CallError::NoSuchProcess(from),
                reason => CallError::Exited {
                    pid: from,
                    reason: reason.to_string(),
                },
            })),
            _ => {
                trace!("Call to {} ignored stray message", self.target);
                None
            }
        }
    }

    fn timeout(&self, timeout: Duration) -> CallError {
        CallError::Timeout {
            pid: self.target,
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    fn closed(&self) -> CallError {
        CallError::Protocol(format!("reply port {} closed", self.port.pid))
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.port.handle.scheduler().demonitor(self.monitor);
    }
}

impl RuntimeHandle {
    /// Open a host port
    pub fn open_port(&self) -> Port {
        Port::open(self)
    }

    /// Send `request` to `target` and wait for the reply
    ///
    /// The request carries a fresh reference; the server answers with
    /// `Context::reply(from, reference, ..)`. Fails fast if the target dies
    /// before replying. Blocks the calling thread, so in manual mode some
    /// other thread must drive the scheduler.
    pub fn call(
        &self,
        target: Pid,
        tag: SchemaId,
        request: &Value,
        timeout: Duration,
    ) -> Result<Value, CallError> {
        let pending = PendingCall::start(self, target, tag, request)?;
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match pending.port.rx.recv_timeout(remaining) {
                Ok(message) => {
                    if let Some(result) = pending.accept(message) {
                        return result;
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Err(pending.timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(pending.closed()),
            }
        }
    }

    /// `call` for async hosts
    pub async fn call_async(
        &self,
        target: Pid,
        tag: SchemaId,
        request: &Value,
        timeout: Duration,
    ) -> Result<Value, CallError> {
        let pending = PendingCall::start(self, target, tag, request)?;

        let wait = async {
            loop {
                match pending.port.rx.recv_async().await {
                    Ok(message) => {
                        if let Some(result) = pending.accept(message) {
                            return result;
                        }
                    }
                    Err(_) => return Err(pending.closed()),
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(pending.timeout(timeout)),
        }
    }

    /// Wait until `pid` terminates
    ///
    /// Returns its exit reason, or `None` on timeout. A pid that is already
    /// gone yields its retained reason, or `NoProc`.
    pub fn wait_exit(&self, pid: Pid, timeout: Duration) -> Option<ExitReason> {
        let port = self.open_port();
        let monitor = port.monitor(pid).ok()?;
        let deadline = Instant::now() + timeout;

        let reason = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(message) = port.recv_timeout(remaining) else {
                break None;
            };
            match message.kind {
                MessageKind::Down {
                    reference, reason, ..
                } if reference == monitor => break Some(reason),
                _ => {}
            }
        };

        match reason {
            Some(ExitReason::NoProc) => Some(self.exit_reason(pid).unwrap_or(ExitReason::NoProc)),
            Some(reason) => Some(reason),
            None => {
                self.scheduler().demonitor(monitor);
                None
            }
        }
    }
}
