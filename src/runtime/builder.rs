/*!
 * Runtime Builder
 * Builder pattern for Runtime construction
 */

use super::Runtime;
use crate::core::config::RuntimeConfig;
use crate::core::types::KernelResult;
use std::time::Duration;

/// Builder for [`Runtime`]
#[derive(Debug, Clone, Default)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
}

impl RuntimeBuilder {
    /// Start from the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: RuntimeConfig) -> Self {
        Self { config }
    }

    /// Number of worker threads; zero means manual mode
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// No worker threads; drive with `run_until_idle`
    pub fn manual(self) -> Self {
        self.workers(0)
    }

    pub fn reductions_per_quantum(mut self, reductions: u32) -> Self {
        self.config.reductions_per_quantum = reductions;
        self
    }

    pub fn max_processes(mut self, max: usize) -> Self {
        self.config.max_processes = max;
        self
    }

    /// Default per-process heap limit in bytes
    pub fn max_heap_bytes(mut self, bytes: usize) -> Self {
        self.config.max_heap_bytes = bytes;
        self
    }

    /// Default mailbox capacity; `None` is unbounded
    pub fn mailbox_capacity(mut self, capacity: Option<usize>) -> Self {
        self.config.mailbox_capacity = capacity;
        self
    }

    pub fn gc_min_threshold(mut self, bytes: usize) -> Self {
        self.config.gc_min_threshold = bytes;
        self
    }

    pub fn tombstone_retention(mut self, count: usize) -> Self {
        self.config.tombstone_retention = count;
        self
    }

    /// Longest an idle worker sleeps before rechecking timers
    pub fn idle_park(mut self, park: Duration) -> Self {
        self.config.idle_park_ms = park.as_millis().max(1) as u64;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Validate the configuration and start the workers
    pub fn build(self) -> KernelResult<Runtime> {
        Runtime::start(self.config)
    }
}
