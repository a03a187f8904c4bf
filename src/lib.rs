/*!
 * Lightweight Process Kernel
 * Actor runtime core: isolated processes, copied messages and preemptive scheduling
 *
 * - `heap`: per-process arena heaps and deep copy
 * - `mailbox`: typed FIFO mailboxes with selective receive
 * - `process`: state machine, handlers and the handler context
 * - `scheduler`: reduction-counted quanta over a worker pool
 * - `link`: links, monitors and exit propagation
 * - `runtime`: host-facing handle, builder and calls
 */

pub mod core;
pub mod heap;
pub mod link;
pub mod mailbox;
pub mod monitoring;
pub mod process;
pub mod registry;
pub mod runtime;
pub mod scheduler;

// Re-exports
pub use crate::core::{
    CallError, KernelError, KernelResult, Pid, ProcessError, Ref, RuntimeConfig, SchemaId,
};
pub use heap::{ArenaHeap, HeapError, Term, TermKind, Value};
pub use mailbox::{MailboxError, MessageKind, Receive};
pub use monitoring::init_tracing;
pub use process::{
    handler, named, Context, Delivery, ExitReason, Fault, Handler, HandlerRef, Message, Next,
    ProcessInfo, ProcessState, SpawnOptions,
};
pub use registry::PortMessage;
pub use runtime::{Port, Runtime, RuntimeBuilder, RuntimeHandle};
pub use scheduler::{QuantumOutcome, RuntimeStats};
