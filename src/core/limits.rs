/*!
 * System Limits and Constants
 *
 * Centralized location for runtime-wide limits, thresholds, and magic numbers.
 * Organized by domain for maintainability and discoverability.
 *
 * - Performance-critical constants are marked with [PERF]
 * - Fairness-critical constants are marked with [FAIRNESS]
 */

use std::time::Duration;

// =============================================================================
// SCHEDULING
// =============================================================================

/// Reductions granted per quantum
/// [FAIRNESS] Upper bound on work a process does before it is forced back to ready
pub const DEFAULT_REDUCTIONS: u32 = 2_000;

/// Smallest accepted per-quantum budget
pub const MIN_REDUCTIONS: u32 = 1;

/// Injector poll interval in quanta
/// [FAIRNESS] A worker checks the global injector first every N quanta so
/// externally spawned processes cannot be starved by a busy local queue
pub const GLOBAL_POLL_INTERVAL: u64 = 31;

/// How long an idle worker parks before rechecking timers and queues
pub const DEFAULT_IDLE_PARK: Duration = Duration::from_millis(5);

/// Upper bound on worker threads
pub const MAX_WORKERS: usize = 256;

// =============================================================================
// REDUCTION COSTS
// =============================================================================

/// Cost of taking one message out of the mailbox
pub const RECEIVE_COST: i64 = 1;

/// Base cost of a send (copy cost is added on top)
pub const SEND_COST: i64 = 2;

/// Cost of spawning a process
pub const SPAWN_COST: i64 = 10;

/// Cost of link/monitor bookkeeping
pub const LINK_COST: i64 = 2;

/// Words copied per reduction during deep copy
/// [PERF] Keeps big copies from running far past the budget unaccounted
pub const COPY_WORDS_PER_REDUCTION: usize = 64;

// =============================================================================
// PROCESS LIMITS
// =============================================================================

/// Default cap on live processes
pub const DEFAULT_MAX_PROCESSES: usize = 1_048_576;

/// Default per-process heap limit (64MB)
pub const DEFAULT_MAX_HEAP_BYTES: usize = 64 * 1024 * 1024;

/// Tombstones retained for exit-reason lookups
pub const DEFAULT_TOMBSTONE_RETENTION: usize = 65_536;

// =============================================================================
// HEAP LAYOUT
// =============================================================================

/// Term slots per regular segment
/// [PERF] Segment growth amortizes allocator calls
pub const SEGMENT_WORDS: usize = 512;

/// Byte capacity per regular segment (8KB)
pub const SEGMENT_BYTES: usize = 8 * 1024;

/// Term slots per message fragment segment
pub const FRAGMENT_SEGMENT_WORDS: usize = 16;

/// Byte capacity per message fragment segment
pub const FRAGMENT_SEGMENT_BYTES: usize = 256;

/// Heap size that triggers the first collection (256KB)
pub const DEFAULT_GC_MIN_THRESHOLD: usize = 256 * 1024;

/// Threshold growth factor after a collection
pub const GC_GROWTH_FACTOR: usize = 2;

/// Initial capacity of the per-thread scratch arena used by deep copy (64KB)
pub const SCRATCH_ARENA_CAPACITY: usize = 64 * 1024;

// =============================================================================
// MAILBOX LIMITS
// =============================================================================

/// Hard cap on a bounded mailbox's configured capacity
pub const MAX_MAILBOX_CAPACITY: usize = 1_000_000;
