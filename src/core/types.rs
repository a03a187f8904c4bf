/*!
 * Core Types
 * Common types used across the runtime
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process identifier
///
/// Issued monotonically and never reused, so a stale identifier can only ever
/// resolve to the process it was issued for (or to that process's tombstone).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub u64);

impl Pid {
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<0.{}>", self.0)
    }
}

/// Unique reference (monitor handles, call correlation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ref(pub u64);

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#Ref<{}>", self.0)
    }
}

/// Message schema identifier
///
/// Assigned by the upstream compiler; the runtime only compares tags and never
/// checks a payload against its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(pub u32);

impl SchemaId {
    /// Tag used when the sender has no schema to report
    pub const UNTYPED: SchemaId = SchemaId(0);
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema#{}", self.0)
    }
}

/// Heap identity, stamped into every boxed term
pub type HeapId = u64;

/// Reduction budget (signed: a handler may overdraw inside one invocation)
pub type Reductions = i64;

/// Worker index inside the scheduler pool
pub type WorkerId = usize;

/// Common result type for runtime operations
pub type KernelResult<T> = Result<T, super::errors::KernelError>;
