/*!
 * Mailbox Types
 * Envelopes, message kinds, receive patterns and errors
 */

use crate::core::errors::panic_message;
use crate::core::types::{Pid, Ref, SchemaId};
use crate::heap::{ArenaHeap, Term};
use crate::process::types::ExitReason;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Mailbox operation result
pub type MailboxResult<T> = Result<T, MailboxError>;

/// Mailbox errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum MailboxError {
    #[error("No message matches the receive pattern")]
    #[diagnostic(code(mailbox::would_block))]
    WouldBlock,

    #[error("Mailbox full ({capacity} messages)")]
    #[diagnostic(
        code(mailbox::full),
        help("The receiver is not keeping up with its senders.")
    )]
    Full { capacity: usize },

    #[error("Receive predicate panicked: {0}")]
    #[diagnostic(
        code(mailbox::pattern_panicked),
        help("Predicates passed to Receive::matching must not panic.")
    )]
    PatternPanicked(String),
}

/// What an envelope carries
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    /// Ordinary message tagged with its schema
    User(SchemaId),
    /// A linked peer terminated
    Exit { from: Pid, reason: ExitReason },
    /// A monitored process terminated
    Down {
        reference: Ref,
        from: Pid,
        reason: ExitReason,
    },
    /// Someone asked this process to exit
    ExitRequest { from: Option<Pid>, reason: ExitReason },
}

impl MessageKind {
    /// System messages are never rejected by a bounded mailbox
    #[inline]
    pub const fn is_system(&self) -> bool {
        !matches!(self, MessageKind::User(_))
    }

    #[inline]
    pub const fn tag(&self) -> Option<SchemaId> {
        match self {
            MessageKind::User(tag) => Some(*tag),
            _ => None,
        }
    }

    /// Exit reason carried by exit, down and exit-request messages
    pub fn reason(&self) -> Option<&ExitReason> {
        match self {
            MessageKind::User(_) => None,
            MessageKind::Exit { reason, .. }
            | MessageKind::Down { reason, .. }
            | MessageKind::ExitRequest { reason, .. } => Some(reason),
        }
    }
}

/// A message sitting in a mailbox
///
/// The payload lives in a private fragment heap written by the sender; the
/// receiver copies it into its own heap when it consumes the envelope.
pub struct Envelope {
    pub(crate) seq: u64,
    pub(crate) from: Option<Pid>,
    pub(crate) kind: MessageKind,
    pub(crate) reference: Option<Ref>,
    pub(crate) fragment: ArenaHeap,
    pub(crate) payload: Term,
}

impl Envelope {
    pub fn new(
        from: Option<Pid>,
        kind: MessageKind,
        reference: Option<Ref>,
        fragment: ArenaHeap,
        payload: Term,
    ) -> Self {
        Self {
            seq: 0,
            from,
            kind,
            reference,
            fragment,
            payload,
        }
    }

    /// Message with no payload
    pub fn system(kind: MessageKind) -> Self {
        Self::new(None, kind, None, ArenaHeap::fragment(0), Term::Nil)
    }

    /// Test helper: immediate payload with a tag
    pub fn tagged(from: Option<Pid>, tag: SchemaId, payload: Term) -> Self {
        debug_assert!(payload.is_immediate());
        Self::new(from, MessageKind::User(tag), None, ArenaHeap::fragment(0), payload)
    }

    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[inline]
    pub fn view(&self) -> MessageView<'_> {
        MessageView { envelope: self }
    }

    #[inline]
    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// Split into the parts the receiver needs
    pub(crate) fn into_parts(self) -> (MessageKind, Option<Pid>, Option<Ref>, ArenaHeap, Term) {
        (
            self.kind,
            self.from,
            self.reference,
            self.fragment,
            self.payload,
        )
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("seq", &self.seq)
            .field("from", &self.from)
            .field("kind", &self.kind)
            .field("reference", &self.reference)
            .field("payload", &self.payload.kind())
            .finish()
    }
}

/// Read-only view handed to receive predicates
#[derive(Clone, Copy)]
pub struct MessageView<'a> {
    envelope: &'a Envelope,
}

impl<'a> MessageView<'a> {
    #[inline]
    pub fn kind(&self) -> &'a MessageKind {
        &self.envelope.kind
    }

    #[inline]
    pub fn tag(&self) -> Option<SchemaId> {
        self.envelope.kind.tag()
    }

    #[inline]
    pub fn from(&self) -> Option<Pid> {
        self.envelope.from
    }

    #[inline]
    pub fn reference(&self) -> Option<Ref> {
        self.envelope.reference
    }

    #[inline]
    pub fn payload(&self) -> Term {
        self.envelope.payload
    }

    /// Heap that resolves `payload()`
    #[inline]
    pub fn heap(&self) -> &'a ArenaHeap {
        &self.envelope.fragment
    }
}

type Predicate = Arc<dyn Fn(&MessageView<'_>) -> bool + Send + Sync>;

#[derive(Clone)]
enum Filter {
    Any,
    Tag(SchemaId),
    Reference(Ref),
    System,
    Predicate(Predicate),
}

/// Receive pattern: which messages are eligible, and how long to wait
#[derive(Clone)]
pub struct Receive {
    filter: Filter,
    timeout: Option<Duration>,
}

impl Receive {
    /// Head of the mailbox, whatever it is
    pub fn any() -> Self {
        Self {
            filter: Filter::Any,
            timeout: None,
        }
    }

    /// First user message with this schema tag
    pub fn tag(tag: SchemaId) -> Self {
        Self {
            filter: Filter::Tag(tag),
            timeout: None,
        }
    }

    /// First message correlated with `reference` (replies, down notices)
    pub fn reference(reference: Ref) -> Self {
        Self {
            filter: Filter::Reference(reference),
            timeout: None,
        }
    }

    /// First exit, down or exit-request message
    pub fn system() -> Self {
        Self {
            filter: Filter::System,
            timeout: None,
        }
    }

    /// First message accepted by `predicate`
    pub fn matching<F>(predicate: F) -> Self
    where
        F: Fn(&MessageView<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            filter: Filter::Predicate(Arc::new(predicate)),
            timeout: None,
        }
    }

    /// Deliver `Timeout` if nothing matches within `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[inline]
    pub fn is_any(&self) -> bool {
        matches!(self.filter, Filter::Any)
    }

    /// Whether `envelope` is eligible
    ///
    /// A panicking predicate counts as a match, so the owner picks the
    /// envelope up and faults on it in its own quantum.
    pub fn matches(&self, envelope: &Envelope) -> bool {
        self.try_matches(envelope).unwrap_or(true)
    }

    /// Like `matches`, but reports a panicking predicate
    pub fn try_matches(&self, envelope: &Envelope) -> MailboxResult<bool> {
        match &self.filter {
            Filter::Any => Ok(true),
            Filter::Tag(tag) => Ok(envelope.kind.tag() == Some(*tag)),
            Filter::Reference(reference) => Ok(match &envelope.kind {
                MessageKind::Down { reference: r, .. } => r == reference,
                _ => envelope.reference == Some(*reference),
            }),
            Filter::System => Ok(envelope.kind.is_system()),
            Filter::Predicate(predicate) => {
                catch_unwind(AssertUnwindSafe(|| predicate(&envelope.view())))
                    .map_err(|panic| MailboxError::PatternPanicked(panic_message(panic.as_ref())))
            }
        }
    }
}

impl Default for Receive {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Debug for Receive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filter = match &self.filter {
            Filter::Any => "any".to_string(),
            Filter::Tag(tag) => format!("tag({tag})"),
            Filter::Reference(r) => format!("reference({r})"),
            Filter::System => "system".to_string(),
            Filter::Predicate(_) => "predicate".to_string(),
        };
        f.debug_struct("Receive")
            .field("filter", &filter)
            .field("timeout", &self.timeout)
            .finish()
    }
}
