/*!
 * Mailbox Module
 * Typed per-process message queues with selective receive
 */

pub mod queue;
pub mod types;

pub use queue::Mailbox;
pub use types::{Envelope, MailboxError, MailboxResult, MessageKind, MessageView, Receive};
