/*!
 * Link and Monitor Tables
 * Adjacency sets keyed by pid
 */

use crate::core::types::{Pid, Ref};
use ahash::RandomState;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Link and monitor edges
///
/// Whoever removes an edge owns the notification for it. A dying process
/// takes its whole entry at once; a linker that finds its peer dead tries to
/// remove its own edge and only notifies if that removal succeeds.
pub struct LinkTable {
    links: Arc<DashMap<Pid, HashSet<Pid, RandomState>, RandomState>>,
    /// target -> (reference, observer)
    monitors: Arc<DashMap<Pid, Vec<(Ref, Pid)>, RandomState>>,
    /// reference -> target
    monitor_targets: Arc<DashMap<Ref, Pid, RandomState>>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self {
            links: Arc::new(DashMap::with_hasher(RandomState::new())),
            monitors: Arc::new(DashMap::with_hasher(RandomState::new())),
            monitor_targets: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    fn insert_edge(&self, from: Pid, to: Pid) -> bool {
        self.links
            .entry(from)
            .or_insert_with(|| HashSet::with_hasher(RandomState::new()))
            .insert(to)
    }

    /// Remove `to` from `from`'s set; true if it was there
    pub fn remove_edge(&self, from: Pid, to: Pid) -> bool {
        let removed = match self.links.get_mut(&from) {
            Some(mut set) => set.remove(&to),
            None => return false,
        };
        self.links.remove_if(&from, |_, set| set.is_empty());
        removed
    }

    /// Add the symmetric edge; false if it already existed
    pub fn link(&self, a: Pid, b: Pid) -> bool {
        let fresh = self.insert_edge(a, b);
        self.insert_edge(b, a);
        fresh
    }

    pub fn unlink(&self, a: Pid, b: Pid) {
        self.remove_edge(a, b);
        self.remove_edge(b, a);
    }

    pub fn is_linked(&self, a: Pid, b: Pid) -> bool {
        self.links.get(&a).map_or(false, |set| set.contains(&b))
    }

    pub fn links_of(&self, pid: Pid) -> Vec<Pid> {
        let mut peers: Vec<Pid> = self
            .links
            .get(&pid)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        peers.sort_unstable();
        peers
    }

    /// Take every link of a dying process and drop the reverse edges
    pub fn take_links(&self, pid: Pid) -> Vec<Pid> {
        let peers: Vec<Pid> = match self.links.remove(&pid) {
            Some((_, set)) => set.into_iter().collect(),
            None => return Vec::new(),
        };
        for peer in &peers {
            self.remove_edge(*peer, pid);
        }
        peers
    }

    pub fn add_monitor(&self, reference: Ref, observer: Pid, target: Pid) {
        self.monitor_targets.insert(reference, target);
        self.monitors
            .entry(target)
            .or_default()
            .push((reference, observer));
    }

    /// Remove a monitor; returns (observer, target) if it was still armed
    pub fn remove_monitor(&self, reference: Ref) -> Option<(Pid, Pid)> {
        let (_, target) = self.monitor_targets.remove(&reference)?;
        let observer = {
            let mut entry = self.monitors.get_mut(&target)?;
            let index = entry.iter().position(|(r, _)| *r == reference)?;
            entry.swap_remove(index).1
        };
        self.monitors.remove_if(&target, |_, list| list.is_empty());
        Some((observer, target))
    }

    /// Take every monitor watching a dying process, in creation order
    pub fn take_monitors(&self, target: Pid) -> Vec<(Ref, Pid)> {
        let mut watchers = match self.monitors.remove(&target) {
            Some((_, list)) => list,
            None => return Vec::new(),
        };
        for (reference, _) in &watchers {
            self.monitor_targets.remove(reference);
        }
        watchers.sort_unstable_by_key(|(r, _)| *r);
        watchers
    }

    pub fn monitor_count(&self, target: Pid) -> usize {
        self.monitors.get(&target).map_or(0, |list| list.len())
    }
}

impl Default for LinkTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LinkTable {
    fn clone(&self) -> Self {
        Self {
            links: Arc::clone(&self.links),
            monitors: Arc::clone(&self.monitors),
            monitor_targets: Arc::clone(&self.monitor_targets),
        }
    }
}
