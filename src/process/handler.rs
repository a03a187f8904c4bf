/*!
 * Handler Capability
 * The behaviour a process runs, and what it hands back to the scheduler
 */

use super::context::Context;
use super::types::{ExitReason, Fault};
use crate::core::types::{Pid, Ref, SchemaId};
use crate::heap::Term;
use crate::mailbox::{MessageKind, Receive};
use std::sync::Arc;

/// A consumed message, payload already copied into the process heap
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: MessageKind,
    pub from: Option<Pid>,
    pub reference: Option<Ref>,
    pub payload: Term,
}

impl Message {
    #[inline]
    pub fn tag(&self) -> Option<SchemaId> {
        self.kind.tag()
    }

    #[inline]
    pub fn is_user(&self) -> bool {
        !self.kind.is_system()
    }

    /// Exit reason of exit, down and exit-request messages
    #[inline]
    pub fn reason(&self) -> Option<&ExitReason> {
        self.kind.reason()
    }
}

/// Why the handler is being invoked
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// First invocation after spawn
    Start,
    /// A message matched the current receive pattern
    Message(Message),
    /// The receive pattern's timeout expired
    Timeout,
    /// Re-entry after `Next::Yield`
    Resume,
}

/// What the process does after an invocation
#[derive(Debug, Clone)]
pub enum Next {
    /// Keep the new state and take the next message in arrival order
    Continue(Term),
    /// Keep the new state and wait for a message matching `pattern`
    Receive { state: Term, pattern: Receive },
    /// Give up the worker now; resumes with `Delivery::Resume`
    Yield(Term),
    /// Terminate
    Exit(ExitReason),
}

impl Next {
    pub fn receive(state: Term, pattern: Receive) -> Self {
        Next::Receive { state, pattern }
    }

    /// Terminate with `ExitReason::Normal`
    pub fn stop() -> Self {
        Next::Exit(ExitReason::Normal)
    }
}

/// Process behaviour
///
/// A handler runs to completion on each invocation; the scheduler preempts
/// only between invocations. Use `Next::Yield` to split long work.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, ctx: &mut Context<'_>, state: Term, delivery: Delivery) -> Result<Next, Fault>;

    /// Name reported in process info and logs
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> Handler for F
where
    F: Fn(&mut Context<'_>, Term, Delivery) -> Result<Next, Fault> + Send + Sync + 'static,
{
    fn handle(&self, ctx: &mut Context<'_>, state: Term, delivery: Delivery) -> Result<Next, Fault> {
        self(ctx, state, delivery)
    }
}

/// Shared handler reference
pub type HandlerRef = Arc<dyn Handler>;

/// Handler with a reported name
pub struct Named<H> {
    name: String,
    inner: H,
}

impl<H: Handler> Named<H> {
    pub fn new(name: impl Into<String>, inner: H) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

impl<H: Handler> Handler for Named<H> {
    fn handle(&self, ctx: &mut Context<'_>, state: Term, delivery: Delivery) -> Result<Next, Fault> {
        self.inner.handle(ctx, state, delivery)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Closure handler reporting `name`
pub fn named<F>(name: impl Into<String>, f: F) -> HandlerRef
where
    F: Fn(&mut Context<'_>, Term, Delivery) -> Result<Next, Fault> + Send + Sync + 'static,
{
    Arc::new(Named::new(name, f))
}

/// Closure handler
pub fn handler<F>(f: F) -> HandlerRef
where
    F: Fn(&mut Context<'_>, Term, Delivery) -> Result<Next, Fault> + Send + Sync + 'static,
{
    Arc::new(f)
}
