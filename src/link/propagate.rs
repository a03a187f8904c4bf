/*!
 * Exit Propagation
 * Link and monitor operations, and notification on process death
 */

use crate::core::errors::{ProcessError, ProcessResult};
use crate::core::types::{Pid, Ref};
use crate::mailbox::MessageKind;
use crate::process::types::ExitReason;
use crate::registry::Resolved;
use crate::scheduler::{Payload, Scheduler};
use log::{debug, trace};

impl Scheduler {
    /// Link `a` and `b`
    ///
    /// `a` must be alive. If `b` is already dead, `a` receives an exit
    /// notification with reason `NoProc` instead of a link.
    pub fn link(&self, a: Pid, b: Pid) -> ProcessResult<()> {
        if a == b {
            return Ok(());
        }
        if !self.is_alive(a) {
            return Err(ProcessError::NoSuchProcess(a));
        }

        self.links().link(a, b);
        if !self.is_alive(b) && self.links().remove_edge(b, a) {
            self.links().remove_edge(a, b);
            self.notify_exit(a, b, ExitReason::NoProc);
        }
        Ok(())
    }

    pub fn unlink(&self, a: Pid, b: Pid) {
        self.links().unlink(a, b);
    }

    /// Watch `target` on behalf of `observer`
    ///
    /// The observer must be a live process or an open reply port. A dead
    /// target produces an immediate `Down` with reason `NoProc`.
    pub fn monitor(&self, observer: Pid, target: Pid) -> ProcessResult<Ref> {
        if !self.can_observe(observer) {
            return Err(ProcessError::NoSuchProcess(observer));
        }

        let reference = self.make_ref();
        self.links().add_monitor(reference, observer, target);

        if !self.is_alive(target) && self.links().remove_monitor(reference).is_some() {
            self.notify_down(observer, reference, target, ExitReason::NoProc);
        }
        Ok(reference)
    }

    /// Live processes and open reply ports can receive `Down` notices
    pub(crate) fn can_observe(&self, pid: Pid) -> bool {
        matches!(
            self.registry().resolve(pid),
            Resolved::Live(_) | Resolved::Port(_)
        )
    }

    /// Disarm a monitor; false if it already fired or never existed
    pub fn demonitor(&self, reference: Ref) -> bool {
        self.links().remove_monitor(reference).is_some()
    }

    /// Notify links and monitors of `pid`'s death
    ///
    /// Runs after `pid` is marked dead, so no new edge can be added without
    /// its creator noticing the death itself.
    pub(crate) fn propagate_exit(&self, pid: Pid, reason: &ExitReason) {
        let peers = self.links().take_links(pid);
        let watchers = self.links().take_monitors(pid);
        if !peers.is_empty() || !watchers.is_empty() {
            debug!(
                "Propagating exit of {} ({}) to {} links, {} monitors",
                pid,
                reason,
                peers.len(),
                watchers.len()
            );
        }

        for peer in peers {
            self.notify_exit(peer, pid, reason.clone());
        }
        for (reference, observer) in watchers {
            self.notify_down(observer, reference, pid, reason.clone());
        }
    }

    fn notify_exit(&self, to: Pid, from: Pid, reason: ExitReason) {
        let kind = MessageKind::Exit { from, reason };
        if let Err(e) = self.deliver(to, Some(from), kind, None, Payload::Empty) {
            trace!("Exit notice to {} dropped: {}", to, e);
        }
    }

    fn notify_down(&self, to: Pid, reference: Ref, from: Pid, reason: ExitReason) {
        let kind = MessageKind::Down {
            reference,
            from,
            reason,
        };
        if let Err(e) = self.deliver(to, Some(from), kind, Some(reference), Payload::Empty) {
            trace!("Down notice to {} dropped: {}", to, e);
        }
    }
}
