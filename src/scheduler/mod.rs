/*!
 * Process Scheduler
 * Reduction-counted preemptive scheduling over a fixed worker pool
 */

use crate::core::config::RuntimeConfig;
use crate::core::id::{IdGenerator, RefGenerator};
use crate::core::types::Ref;
use crate::link::LinkTable;
use crate::registry::Registry;
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod operations;
mod quantum;
pub mod queues;
pub mod stats;
pub mod timer;
pub mod types;
mod worker;

pub use operations::Payload;
pub use queues::RunQueues;
pub use stats::{AtomicSchedulerStats, RuntimeStats};
pub use timer::TimerQueue;
pub use types::QuantumOutcome;

/// Shared scheduler state
///
/// Cheap to clone; every clone drives the same processes. Workers, the
/// host-facing handle and handler contexts all go through this type.
///
/// # Performance
/// - Lock-free run queues and atomic stats on the hot path
/// - Process state sits behind a per-process lock, never a global one
#[repr(C, align(64))]
pub struct Scheduler {
    config: Arc<RuntimeConfig>,
    registry: Registry,
    links: LinkTable,
    queues: Arc<RunQueues>,
    timers: Arc<TimerQueue>,
    stats: Arc<AtomicSchedulerStats>,
    refs: RefGenerator,
    running: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(config: RuntimeConfig) -> Self {
        info!(
            "Scheduler initialized: workers={}, reductions={}, max_processes={}",
            config.workers, config.reductions_per_quantum, config.max_processes
        );

        Self {
            registry: Registry::new(config.tombstone_retention),
            links: LinkTable::new(),
            queues: Arc::new(RunQueues::new(config.workers)),
            timers: Arc::new(TimerQueue::new()),
            stats: Arc::new(AtomicSchedulerStats::new()),
            refs: RefGenerator::default_start(),
            running: Arc::new(AtomicBool::new(true)),
            config: Arc::new(config),
        }
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    #[inline]
    pub fn queues(&self) -> &RunQueues {
        &self.queues
    }

    #[inline]
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    #[inline]
    pub fn make_ref(&self) -> Ref {
        self.refs.next()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask workers to exit after their current quantum
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.queues.notify_all();
    }

    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            workers: self.config.workers,
            live_processes: self.registry.live_count(),
            ready_queue_len: self.queues.len(),
            pending_timers: self.timers.len(),
            ..self.stats.snapshot()
        }
    }
}

impl Clone for Scheduler {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            registry: self.registry.clone(),
            links: self.links.clone(),
            queues: Arc::clone(&self.queues),
            timers: Arc::clone(&self.timers),
            stats: Arc::clone(&self.stats),
            refs: self.refs.clone(),
            running: Arc::clone(&self.running),
        }
    }
}
