/*!
 * Identifier Generators
 * Lock-free monotonic generators for pids, references and heap identities
 */

use super::types::{HeapId, Pid, Ref};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of identifiers of type `T`
pub trait IdGenerator<T> {
    fn next(&self) -> T;

    /// The identifier `next` would return
    fn current(&self) -> T;
}

/// Shared monotonic counter
///
/// Clones share one counter. Identifiers are never recycled: a pid or ref
/// handed out once can only ever name the thing it was issued for.
///
/// # Performance
/// - Own cache line, so hot spawn paths do not false-share with neighbours
#[repr(C, align(64))]
pub struct AtomicGenerator<T> {
    counter: Arc<AtomicU64>,
    _marker: std::marker::PhantomData<T>,
}

impl<T> AtomicGenerator<T> {
    #[inline]
    pub fn new(start: u64) -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(start)),
            _marker: std::marker::PhantomData,
        }
    }

    /// Start at 1, keeping 0 free as a sentinel
    #[inline]
    pub fn default_start() -> Self {
        Self::new(1)
    }

    #[inline]
    fn bump(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    fn peek(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl<T> Clone for AtomicGenerator<T> {
    fn clone(&self) -> Self {
        Self {
            counter: Arc::clone(&self.counter),
            _marker: std::marker::PhantomData,
        }
    }
}

impl IdGenerator<Pid> for AtomicGenerator<Pid> {
    #[inline]
    fn next(&self) -> Pid {
        Pid(self.bump())
    }

    #[inline]
    fn current(&self) -> Pid {
        Pid(self.peek())
    }
}

impl IdGenerator<Ref> for AtomicGenerator<Ref> {
    #[inline]
    fn next(&self) -> Ref {
        Ref(self.bump())
    }

    #[inline]
    fn current(&self) -> Ref {
        Ref(self.peek())
    }
}

/// Process ID generator
pub type PidGenerator = AtomicGenerator<Pid>;

/// Reference generator
pub type RefGenerator = AtomicGenerator<Ref>;

static HEAP_IDS: AtomicU64 = AtomicU64::new(1);

/// Next process-wide unique heap identity
#[inline]
pub fn next_heap_id() -> HeapId {
    HEAP_IDS.fetch_add(1, Ordering::Relaxed)
}
