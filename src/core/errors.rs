/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::Pid;
use crate::process::types::ProcessState;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export subsystem errors
pub use crate::heap::{CodecError, HeapError};
pub use crate::mailbox::MailboxError;

/// Process-related errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ProcessError {
    #[error("No such process: {0}")]
    #[diagnostic(
        code(process::no_such_process),
        help("The process has exited or the identifier was never issued. Sends to it are dropped.")
    )]
    NoSuchProcess(Pid),

    #[error("Resource exhausted: {0}")]
    #[diagnostic(
        code(process::resource_exhausted),
        help("The initial state or message did not fit in the process heap. Raise max_heap_bytes.")
    )]
    ResourceExhausted(String),

    #[error("Process limit reached: {limit} live processes")]
    #[diagnostic(
        code(process::limit_reached),
        help("Maximum number of processes reached. Let idle processes exit or raise max_processes.")
    )]
    LimitReached { limit: usize },

    #[error("Mailbox of {pid} is full ({capacity} messages)")]
    #[diagnostic(
        code(process::mailbox_full),
        help("The receiver is not keeping up. Retry later or give it a larger mailbox.")
    )]
    MailboxFull { pid: Pid, capacity: usize },

    #[error("Invalid state transition for {pid}: {from:?} -> {to:?}")]
    #[diagnostic(
        code(process::invalid_state_transition),
        help("Operation cannot be performed in the current process state.")
    )]
    InvalidStateTransition {
        pid: Pid,
        from: ProcessState,
        to: ProcessState,
    },

    #[error("Invalid operation: {0}")]
    #[diagnostic(code(process::invalid_operation))]
    InvalidOperation(String),

    #[error("Name already registered: {0}")]
    #[diagnostic(
        code(process::name_taken),
        help("Each name maps to one live process. Unregister it or pick another name.")
    )]
    NameTaken(String),
}

/// Process operation result
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

impl From<HeapError> for ProcessError {
    fn from(err: HeapError) -> Self {
        ProcessError::ResourceExhausted(err.to_string())
    }
}

/// Request/reply errors seen by the host
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum CallError {
    #[error("No such process: {0}")]
    #[diagnostic(code(call::no_such_process))]
    NoSuchProcess(Pid),

    #[error("Call to {pid} timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(call::timeout),
        help("The process did not reply in time. It may be busy, blocked on another pattern, or dead.")
    )]
    Timeout { pid: Pid, timeout_ms: u64 },

    #[error("{pid} exited before replying: {reason}")]
    #[diagnostic(code(call::exited))]
    Exited { pid: Pid, reason: String },

    #[error("Call protocol error: {0}")]
    #[diagnostic(code(call::protocol))]
    Protocol(String),

    #[error("Call rejected: {0}")]
    #[diagnostic(transparent)]
    Rejected(ProcessError),
}

impl From<ProcessError> for CallError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::NoSuchProcess(pid) => CallError::NoSuchProcess(pid),
            other => CallError::Rejected(other),
        }
    }
}

/// Unified runtime error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum KernelError {
    #[error("Heap error: {0}")]
    #[diagnostic(transparent)]
    Heap(#[from] HeapError),

    #[error("Mailbox error: {0}")]
    #[diagnostic(transparent)]
    Mailbox(#[from] MailboxError),

    #[error("Process error: {0}")]
    #[diagnostic(transparent)]
    Process(#[from] ProcessError),

    #[error("Call error: {0}")]
    #[diagnostic(transparent)]
    Call(#[from] CallError),

    #[error("Codec error: {0}")]
    #[diagnostic(transparent)]
    Codec(#[from] CodecError),

    #[error("Internal error: {0}")]
    #[diagnostic(
        code(kernel::internal_error),
        help("An unexpected internal error occurred. Please report this issue.")
    )]
    Internal(String),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(kernel::io_error),
        help("Filesystem or I/O operation failed. Check file permissions.")
    )]
    Io(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(kernel::configuration_error),
        help("Invalid configuration. Review configuration parameters.")
    )]
    Configuration(String),
}

impl From<std::io::Error> for KernelError {
    fn from(err: std::io::Error) -> Self {
        KernelError::Io(err.to_string())
    }
}

impl From<String> for KernelError {
    fn from(msg: String) -> Self {
        KernelError::Internal(msg)
    }
}

impl From<&str> for KernelError {
    fn from(msg: &str) -> Self {
        KernelError::Internal(msg.into())
    }
}

/// Serializable error representation for host reporting
///
/// `details` carries the miette code when the error has one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SerializableError {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl SerializableError {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_type: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

impl From<KernelError> for SerializableError {
    fn from(err: KernelError) -> Self {
        let error_type = match &err {
            KernelError::Heap(_) => "heap_error",
            KernelError::Mailbox(_) => "mailbox_error",
            KernelError::Process(_) => "process_error",
            KernelError::Call(_) => "call_error",
            KernelError::Codec(_) => "codec_error",
            KernelError::Internal(_) => "internal_error",
            KernelError::Io(_) => "io_error",
            KernelError::Configuration(_) => "configuration_error",
        };
        let code = err.code().map(|c| c.to_string());
        match code {
            Some(code) => SerializableError::with_details(error_type, err.to_string(), code),
            None => SerializableError::new(error_type, err.to_string()),
        }
    }
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, KernelError>;

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
