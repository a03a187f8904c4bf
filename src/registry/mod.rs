/*!
 * Process Registry
 * Concurrent pid -> process map with tombstones, names and reply ports
 */

use crate::core::errors::ProcessError;
use crate::core::id::{IdGenerator, PidGenerator};
use crate::core::types::{Pid, Ref};
use crate::heap::Value;
use crate::mailbox::MessageKind;
use crate::process::slot::ProcessSlot;
use crate::process::types::ExitReason;
use ahash::RandomState;
use dashmap::DashMap;
use log::{debug, trace};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Message delivered to a host reply port
#[derive(Debug, Clone, PartialEq)]
pub struct PortMessage {
    pub from: Option<Pid>,
    pub kind: MessageKind,
    pub reference: Option<Ref>,
    pub value: Value,
}

/// What a pid currently refers to
pub enum Resolved {
    Live(Arc<ProcessSlot>),
    /// Host-side reply port
    Port(flume::Sender<PortMessage>),
    /// Dead; reason kept while the tombstone is retained
    Dead(Option<ExitReason>),
    /// Never issued
    Unknown,
}

/// Process registry
///
/// Holds handles only: a slot is reached through its pid, never through a
/// pointer kept by another process.
pub struct Registry {
    live: Arc<DashMap<Pid, Arc<ProcessSlot>, RandomState>>,
    /// Admitted processes not yet buried; gates `max_processes`
    admitted: Arc<AtomicUsize>,
    ports: Arc<DashMap<Pid, flume::Sender<PortMessage>, RandomState>>,
    tombstones: Arc<DashMap<Pid, ExitReason, RandomState>>,
    retention: Arc<Mutex<VecDeque<Pid>>>,
    retention_limit: usize,
    names: Arc<DashMap<String, Pid, RandomState>>,
    pids: PidGenerator,
}

impl Registry {
    pub fn new(retention_limit: usize) -> Self {
        Self {
            live: Arc::new(DashMap::with_hasher(RandomState::new())),
            admitted: Arc::new(AtomicUsize::new(0)),
            ports: Arc::new(DashMap::with_hasher(RandomState::new())),
            tombstones: Arc::new(DashMap::with_hasher(RandomState::new())),
            retention: Arc::new(Mutex::new(VecDeque::new())),
            retention_limit,
            names: Arc::new(DashMap::with_hasher(RandomState::new())),
            pids: PidGenerator::default_start(),
        }
    }

    /// Issue a fresh pid; never reused
    #[inline]
    pub fn allocate_pid(&self) -> Pid {
        self.pids.next()
    }

    #[inline]
    pub fn was_issued(&self, pid: Pid) -> bool {
        pid.0 >= 1 && pid < self.pids.current()
    }

    /// Add a new process, unless `limit` processes are already live
    ///
    /// Admission is a single atomic step, so concurrent spawns cannot
    /// overshoot the limit.
    pub fn insert(&self, slot: Arc<ProcessSlot>, limit: usize) -> Result<(), ProcessError> {
        self.admitted
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .map_err(|_| ProcessError::LimitReached { limit })?;
        self.live.insert(slot.pid, slot);
        Ok(())
    }

    #[inline]
    pub fn get(&self, pid: Pid) -> Option<Arc<ProcessSlot>> {
        self.live.get(&pid).map(|entry| Arc::clone(entry.value()))
    }

    pub fn resolve(&self, pid: Pid) -> Resolved {
        if let Some(slot) = self.get(pid) {
            return Resolved::Live(slot);
        }
        if let Some(port) = self.ports.get(&pid) {
            return Resolved::Port(port.value().clone());
        }
        if let Some(reason) = self.tombstones.get(&pid) {
            return Resolved::Dead(Some(reason.value().clone()));
        }
        if self.was_issued(pid) {
            Resolved::Dead(None)
        } else {
            Resolved::Unknown
        }
    }

    /// Move a dead process from the live table to the tombstones
    pub fn bury(&self, pid: Pid, reason: ExitReason) {
        if let Some((_, slot)) = self.live.remove(&pid) {
            self.admitted.fetch_sub(1, Ordering::AcqRel);
            if let Some(name) = slot.name.lock().take() {
                self.names.remove_if(&name, |_, owner| *owner == pid);
            }
        }

        if self.retention_limit == 0 {
            return;
        }
        self.tombstones.insert(pid, reason);

        let mut retention = self.retention.lock();
        retention.push_back(pid);
        while retention.len() > self.retention_limit {
            if let Some(old) = retention.pop_front() {
                self.tombstones.remove(&old);
            }
        }
        trace!("Tombstoned {} ({} retained)", pid, retention.len());
    }

    /// Exit reason of a dead process, while retained
    pub fn exit_reason(&self, pid: Pid) -> Option<ExitReason> {
        self.tombstones.get(&pid).map(|r| r.value().clone())
    }

    /// Open a host reply port under a fresh pid
    pub fn open_port(&self) -> (Pid, flume::Receiver<PortMessage>) {
        let pid = self.allocate_pid();
        let (tx, rx) = flume::unbounded();
        self.ports.insert(pid, tx);
        (pid, rx)
    }

    pub fn close_port(&self, pid: Pid) {
        self.ports.remove(&pid);
    }

    /// Bind `name` to a live process
    pub fn register(&self, name: &str, pid: Pid) -> Result<(), ProcessError> {
        let slot = self.get(pid).ok_or(ProcessError::NoSuchProcess(pid))?;

        let mut current = slot.name.lock();
        if current.is_some() {
            return Err(ProcessError::InvalidOperation(format!(
                "{pid} is already registered"
            )));
        }

        match self.names.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if self.live.contains_key(entry.get()) {
                    return Err(ProcessError::NameTaken(name.to_string()));
                }
                entry.insert(pid);
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(pid);
            }
        }
        *current = Some(name.to_string());
        debug!("Registered {} as {:?}", pid, name);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Option<Pid> {
        let (_, pid) = self.names.remove(name)?;
        if let Some(slot) = self.get(pid) {
            slot.name.lock().take();
        }
        Some(pid)
    }

    pub fn whereis(&self, name: &str) -> Option<Pid> {
        let pid = *self.names.get(name)?.value();
        self.live.contains_key(&pid).then_some(pid)
    }

    #[inline]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Pids of all live processes
    pub fn pids(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self.live.iter().map(|e| *e.key()).collect();
        pids.sort_unstable();
        pids
    }
}

impl Clone for Registry {
    fn clone(&self) -> Self {
        Self {
            live: Arc::clone(&self.live),
            admitted: Arc::clone(&self.admitted),
            ports: Arc::clone(&self.ports),
            tombstones: Arc::clone(&self.tombstones),
            retention: Arc::clone(&self.retention),
            retention_limit: self.retention_limit,
            names: Arc::clone(&self.names),
            pids: self.pids.clone(),
        }
    }
}
