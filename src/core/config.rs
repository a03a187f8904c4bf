/*!
 * Runtime Configuration
 * Defaults, environment and JSON sources with validation
 */

use super::errors::KernelError;
use super::limits::{
    DEFAULT_GC_MIN_THRESHOLD, DEFAULT_IDLE_PARK, DEFAULT_MAX_HEAP_BYTES, DEFAULT_MAX_PROCESSES,
    DEFAULT_REDUCTIONS, DEFAULT_TOMBSTONE_RETENTION, MAX_MAILBOX_CAPACITY, MAX_WORKERS,
    MIN_REDUCTIONS,
};
use super::types::KernelResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration
///
/// `workers == 0` selects manual mode: no threads are started and the host
/// drives the scheduler with `run_quantum` / `run_until_idle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RuntimeConfig {
    pub workers: usize,
    pub reductions_per_quantum: u32,
    pub max_processes: usize,
    pub max_heap_bytes: usize,
    /// Default mailbox bound; `None` is unbounded
    pub mailbox_capacity: Option<usize>,
    pub gc_min_threshold: usize,
    pub tombstone_retention: usize,
    pub idle_park_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_WORKERS);

        Self {
            workers,
            reductions_per_quantum: DEFAULT_REDUCTIONS,
            max_processes: DEFAULT_MAX_PROCESSES,
            max_heap_bytes: DEFAULT_MAX_HEAP_BYTES,
            mailbox_capacity: None,
            gc_min_threshold: DEFAULT_GC_MIN_THRESHOLD,
            tombstone_retention: DEFAULT_TOMBSTONE_RETENTION,
            idle_park_ms: DEFAULT_IDLE_PARK.as_millis() as u64,
        }
    }
}

fn parse_var<T: FromStr>(key: &str) -> KernelResult<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| KernelError::Configuration(format!("{key}: cannot parse {raw:?}"))),
        Err(_) => Ok(None),
    }
}

impl RuntimeConfig {
    /// Manual-mode configuration used by deterministic tests
    pub fn manual() -> Self {
        Self {
            workers: 0,
            ..Self::default()
        }
    }

    /// Defaults overridden by `LWP_*` environment variables
    ///
    /// - LWP_WORKERS, LWP_REDUCTIONS, LWP_MAX_PROCESSES, LWP_MAX_HEAP_BYTES
    /// - LWP_MAILBOX_CAPACITY (0 means unbounded)
    /// - LWP_GC_MIN_THRESHOLD, LWP_TOMBSTONE_RETENTION, LWP_IDLE_PARK_MS
    pub fn from_env() -> KernelResult<Self> {
        let mut config = Self::default();

        if let Some(v) = parse_var("LWP_WORKERS")? {
            config.workers = v;
        }
        if let Some(v) = parse_var("LWP_REDUCTIONS")? {
            config.reductions_per_quantum = v;
        }
        if let Some(v) = parse_var("LWP_MAX_PROCESSES")? {
            config.max_processes = v;
        }
        if let Some(v) = parse_var("LWP_MAX_HEAP_BYTES")? {
            config.max_heap_bytes = v;
        }
        if let Some(v) = parse_var::<usize>("LWP_MAILBOX_CAPACITY")? {
            config.mailbox_capacity = (v > 0).then_some(v);
        }
        if let Some(v) = parse_var("LWP_GC_MIN_THRESHOLD")? {
            config.gc_min_threshold = v;
        }
        if let Some(v) = parse_var("LWP_TOMBSTONE_RETENTION")? {
            config.tombstone_retention = v;
        }
        if let Some(v) = parse_var("LWP_IDLE_PARK_MS")? {
            config.idle_park_ms = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> KernelResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| KernelError::Configuration(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> KernelResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    #[inline]
    pub fn idle_park(&self) -> Duration {
        Duration::from_millis(self.idle_park_ms)
    }

    pub fn validate(&self) -> KernelResult<()> {
        let fail = |msg: String| Err(KernelError::Configuration(msg));

        if self.workers > MAX_WORKERS {
            return fail(format!(
                "workers must be at most {MAX_WORKERS}, got {}",
                self.workers
            ));
        }
        if self.reductions_per_quantum < MIN_REDUCTIONS {
            return fail(format!(
                "reductions_per_quantum must be at least {MIN_REDUCTIONS}"
            ));
        }
        if self.max_processes == 0 {
            return fail("max_processes must be positive".into());
        }
        if self.max_heap_bytes == 0 {
            return fail("max_heap_bytes must be positive".into());
        }
        if let Some(capacity) = self.mailbox_capacity {
            if capacity == 0 || capacity > MAX_MAILBOX_CAPACITY {
                return fail(format!(
                    "mailbox_capacity must be in 1..={MAX_MAILBOX_CAPACITY}, got {capacity}"
                ));
            }
        }
        if self.gc_min_threshold == 0 {
            return fail("gc_min_threshold must be positive".into());
        }
        if self.gc_min_threshold >= self.max_heap_bytes {
            return fail(format!(
                "gc_min_threshold ({}) must be below max_heap_bytes ({})",
                self.gc_min_threshold, self.max_heap_bytes
            ));
        }
        if self.idle_park_ms == 0 {
            return fail("idle_park_ms must be positive".into());
        }
        Ok(())
    }
}
