/*!
 * Scheduler Types
 */

use crate::process::types::ExitReason;
use serde::{Deserialize, Serialize};

/// Result of one `run_quantum`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum QuantumOutcome {
    /// Budget exhausted; back in a run queue
    Preempted,
    /// Handler returned `Next::Yield`; back in a run queue
    Yielded,
    /// No eligible message; parked until an enqueue or timeout
    Blocked,
    /// Terminated during this quantum
    Exited(ExitReason),
    /// Stale queue entry: dead, unknown or not ready
    NotRunnable,
}

impl QuantumOutcome {
    /// True if the process went back to a run queue
    #[inline]
    pub fn requeued(&self) -> bool {
        matches!(self, QuantumOutcome::Preempted | QuantumOutcome::Yielded)
    }
}
