/*!
 * Process Types
 * States, exit reasons, faults and spawn options
 */

use crate::core::types::Pid;
use crate::heap::{HeapError, HeapStats, Value};
use crate::mailbox::MailboxError;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Process execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Runnable, sitting in exactly one run queue
    Ready,
    /// Owned by one worker for the current quantum
    Running,
    /// Waiting for a message matching its receive pattern
    Blocked,
    /// Terminal
    Dead,
}

impl ProcessState {
    /// Legal edges of the state machine
    #[inline]
    pub const fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, next),
            (Ready, Running)
                | (Running, Ready)
                | (Running, Blocked)
                | (Running, Dead)
                | (Blocked, Ready)
        )
    }

    #[inline]
    pub const fn is_alive(self) -> bool {
        !matches!(self, ProcessState::Dead)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Ready => "ready",
            ProcessState::Running => "running",
            ProcessState::Blocked => "blocked",
            ProcessState::Dead => "dead",
        };
        f.write_str(s)
    }
}

/// Why a process terminated
///
/// Delivered to linked peers and monitors; never raised as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExitReason {
    /// Handler finished normally
    Normal,
    /// Handler-supplied reason
    Custom(Value),
    /// Handler error or panic
    Fault(String),
    /// Link or monitor target was already dead
    NoProc,
}

impl ExitReason {
    /// `{shutdown, Reason}` custom reason
    pub fn shutdown(reason: &str) -> Self {
        ExitReason::Custom(Value::tuple(vec![
            Value::atom("shutdown"),
            Value::text(reason),
        ]))
    }

    pub fn custom(value: impl Into<Value>) -> Self {
        ExitReason::Custom(value.into())
    }

    #[inline]
    pub fn is_normal(&self) -> bool {
        matches!(self, ExitReason::Normal)
    }

    #[inline]
    pub fn is_fault(&self) -> bool {
        matches!(self, ExitReason::Fault(_))
    }

    /// Text of a `{shutdown, Reason}` reason
    pub fn shutdown_reason(&self) -> Option<&str> {
        let ExitReason::Custom(Value::Tuple(items)) = self else {
            return None;
        };
        match items.as_slice() {
            [tag, Value::Binary(text)] if tag.as_atom() == Some("shutdown") => {
                std::str::from_utf8(text).ok()
            }
            _ => None,
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Normal => f.write_str("normal"),
            ExitReason::Custom(v) => write!(f, "{v}"),
            ExitReason::Fault(msg) => write!(f, "fault: {msg}"),
            ExitReason::NoProc => f.write_str("noproc"),
        }
    }
}

/// Handler-level error; terminates the process with `ExitReason::Fault`
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[error("{message}")]
#[diagnostic(
    code(process::fault),
    help("The process terminated; linked peers and monitors were notified.")
)]
pub struct Fault {
    pub message: String,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<HeapError> for Fault {
    fn from(err: HeapError) -> Self {
        Fault::new(err.to_string())
    }
}

impl From<MailboxError> for Fault {
    fn from(err: MailboxError) -> Self {
        Fault::new(err.to_string())
    }
}

impl From<crate::core::errors::ProcessError> for Fault {
    fn from(err: crate::core::errors::ProcessError) -> Self {
        Fault::new(err.to_string())
    }
}

impl From<&str> for Fault {
    fn from(msg: &str) -> Self {
        Fault::new(msg)
    }
}

impl From<String> for Fault {
    fn from(msg: String) -> Self {
        Fault::new(msg)
    }
}

impl From<Fault> for ExitReason {
    fn from(fault: Fault) -> Self {
        ExitReason::Fault(fault.message)
    }
}

/// Spawn options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnOptions {
    /// Link the new process to this peer
    pub link: Option<Pid>,
    /// Monitor the new process from this observer
    pub monitor_by: Option<Pid>,
    /// Register the new process under a name
    pub name: Option<String>,
    /// Override the configured mailbox bound
    pub mailbox_capacity: Option<usize>,
    /// Override the configured heap limit
    pub max_heap_bytes: Option<usize>,
}

impl SpawnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(mut self, peer: Pid) -> Self {
        self.link = Some(peer);
        self
    }

    pub fn monitor_by(mut self, observer: Pid) -> Self {
        self.monitor_by = Some(observer);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = Some(capacity);
        self
    }

    pub fn max_heap_bytes(mut self, bytes: usize) -> Self {
        self.max_heap_bytes = Some(bytes);
        self
    }
}

/// Snapshot of one live process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: Option<String>,
    pub handler: String,
    pub state: ProcessState,
    pub mailbox_len: usize,
    pub links: Vec<Pid>,
    pub monitored_by: usize,
    pub reductions: u64,
    pub quanta: u64,
    pub messages_received: u64,
    /// `None` while the process is mid-quantum on a worker
    pub heap: Option<HeapStats>,
}
