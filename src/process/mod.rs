/*!
 * Process Module
 * Process state machine, handler capability and execution context
 */

pub mod context;
pub mod handler;
pub mod slot;
pub mod types;

pub use context::Context;
pub use handler::{handler, named, Delivery, Handler, HandlerRef, Message, Named, Next};
pub use slot::{Body, Control, ProcessSlot};
pub use types::{ExitReason, Fault, ProcessInfo, ProcessState, SpawnOptions};
