/*!
 * Lock-Free Scheduler Statistics
 * Uses atomic counters for zero-contention stats tracking in hot scheduling paths
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time runtime statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuntimeStats {
    pub workers: usize,
    pub live_processes: usize,
    pub ready_queue_len: usize,
    pub pending_timers: usize,
    pub quanta: u64,
    pub reductions: u64,
    pub preemptions: u64,
    pub yields: u64,
    pub blocks: u64,
    pub wakeups: u64,
    pub timeouts: u64,
    pub spawns: u64,
    pub exits: u64,
    pub faults: u64,
    pub messages: u64,
    pub steals: u64,
    pub collections: u64,
    pub bytes_reclaimed: u64,
}

/// Atomic scheduler statistics for lock-free updates
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - All operations use relaxed ordering for maximum performance
/// - Read-only snapshot requires no synchronization
#[repr(C, align(64))]
#[derive(Default)]
pub struct AtomicSchedulerStats {
    quanta: AtomicU64,
    reductions: AtomicU64,
    preemptions: AtomicU64,
    yields: AtomicU64,
    blocks: AtomicU64,
    wakeups: AtomicU64,
    timeouts: AtomicU64,
    spawns: AtomicU64,
    exits: AtomicU64,
    faults: AtomicU64,
    messages: AtomicU64,
    steals: AtomicU64,
    collections: AtomicU64,
    bytes_reclaimed: AtomicU64,
}

macro_rules! counter {
    ($($inc:ident => $field:ident),* $(,)?) => {
        $(
            #[inline(always)]
            pub fn $inc(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl AtomicSchedulerStats {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    counter! {
        inc_quanta => quanta,
        inc_preemptions => preemptions,
        inc_yields => yields,
        inc_blocks => blocks,
        inc_wakeups => wakeups,
        inc_timeouts => timeouts,
        inc_spawns => spawns,
        inc_exits => exits,
        inc_faults => faults,
        inc_messages => messages,
        inc_steals => steals,
        inc_collections => collections,
    }

    #[inline(always)]
    pub fn add_reductions(&self, n: u64) {
        self.reductions.fetch_add(n, Ordering::Relaxed);
    }

    /// Heap bytes returned by collections and process death
    #[inline(always)]
    pub fn add_reclaimed(&self, bytes: u64) {
        self.bytes_reclaimed.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Get snapshot of current counters
    ///
    /// # Note
    /// Counter values may not be perfectly consistent with each other due to concurrent updates,
    /// but each individual value is accurate. This is acceptable for monitoring.
    pub fn snapshot(&self) -> RuntimeStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        RuntimeStats {
            quanta: load(&self.quanta),
            reductions: load(&self.reductions),
            preemptions: load(&self.preemptions),
            yields: load(&self.yields),
            blocks: load(&self.blocks),
            wakeups: load(&self.wakeups),
            timeouts: load(&self.timeouts),
            spawns: load(&self.spawns),
            exits: load(&self.exits),
            faults: load(&self.faults),
            messages: load(&self.messages),
            steals: load(&self.steals),
            collections: load(&self.collections),
            bytes_reclaimed: load(&self.bytes_reclaimed),
            ..RuntimeStats::default()
        }
    }
}
