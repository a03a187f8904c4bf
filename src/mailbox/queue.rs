/*!
 * Mailbox Queue
 * Per-process FIFO with selective receive
 */

use super::types::{Envelope, MailboxError, MailboxResult, Receive};
use crate::core::limits::MAX_MAILBOX_CAPACITY;
use crate::core::types::Pid;
use std::collections::VecDeque;

/// Mailbox of exactly one process
///
/// Not synchronised on its own: it lives inside the owning process's control
/// block and is only touched under that lock.
#[derive(Debug)]
pub struct Mailbox {
    owner: Pid,
    capacity: Option<usize>,
    messages: VecDeque<Envelope>,
    next_seq: u64,
    received: u64,
}

impl Mailbox {
    pub fn new(owner: Pid) -> Self {
        Self::with_capacity(owner, None)
    }

    /// `Some(n)` bounds user messages to `n`; system messages always fit
    pub fn with_capacity(owner: Pid, capacity: Option<usize>) -> Self {
        Self {
            owner,
            capacity: capacity.map(|c| c.clamp(1, MAX_MAILBOX_CAPACITY)),
            messages: VecDeque::new(),
            next_seq: 0,
            received: 0,
        }
    }

    #[inline]
    pub fn owner(&self) -> Pid {
        self.owner
    }

    #[inline]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Append to the tail; returns the envelope's sequence number
    pub fn enqueue(&mut self, mut envelope: Envelope) -> MailboxResult<u64> {
        if let Some(capacity) = self.capacity {
            if !envelope.kind.is_system() && self.messages.len() >= capacity {
                return Err(MailboxError::Full { capacity });
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        envelope.seq = seq;
        self.messages.push_back(envelope);
        Ok(seq)
    }

    /// Remove the first envelope accepted by `pattern`
    ///
    /// Envelopes ahead of the match stay where they are. A panicking
    /// predicate leaves the mailbox untouched.
    pub fn receive(&mut self, pattern: &Receive) -> MailboxResult<Envelope> {
        let envelope = if pattern.is_any() {
            self.messages.pop_front()
        } else {
            let mut found = None;
            for (index, envelope) in self.messages.iter().enumerate() {
                if pattern.try_matches(envelope)? {
                    found = Some(index);
                    break;
                }
            }
            found.and_then(|index| self.messages.remove(index))
        };

        match envelope {
            Some(envelope) => {
                self.received += 1;
                Ok(envelope)
            }
            None => Err(MailboxError::WouldBlock),
        }
    }

    pub fn has_match(&self, pattern: &Receive) -> bool {
        if pattern.is_any() {
            return !self.messages.is_empty();
        }
        self.messages.iter().any(|e| pattern.matches(e))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Envelopes consumed so far
    #[inline]
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Discard everything (owner death)
    pub fn drain(&mut self) -> Vec<Envelope> {
        self.messages.drain(..).collect()
    }
}
