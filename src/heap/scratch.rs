/*!
 * Scratch Arena
 * Thread-local bump arena for short-lived traversal state
 */

use crate::core::limits::SCRATCH_ARENA_CAPACITY;
use bumpalo::Bump;
use std::cell::RefCell;

// Thread-local arena reused by deep copy and collection work stacks
//
// # Performance
//
// - **Allocation**: O(1), just bumps pointer
// - **Deallocation**: O(1), reset at the start of the next use
// - Capacity grows to the largest traversal seen on this worker and stays
thread_local! {
    static SCRATCH: RefCell<Option<Bump>> = RefCell::new(None);
}

/// Execute closure with the worker's scratch arena
///
/// Nested calls on the same thread get a private arena instead of the shared
/// one.
#[inline]
pub fn with_scratch<F, R>(f: F) -> R
where
    F: FnOnce(&Bump) -> R,
{
    SCRATCH.with(|cell| match cell.try_borrow_mut() {
        Ok(mut slot) => {
            let arena = slot.get_or_insert_with(|| Bump::with_capacity(SCRATCH_ARENA_CAPACITY));
            arena.reset();
            f(arena)
        }
        Err(_) => f(&Bump::new()),
    })
}

/// Bytes currently reserved by this thread's scratch arena
pub fn scratch_capacity() -> usize {
    SCRATCH.with(|cell| {
        cell.try_borrow()
            .ok()
            .and_then(|slot| slot.as_ref().map(Bump::allocated_bytes))
            .unwrap_or(0)
    })
}
