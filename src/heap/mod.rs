/*!
 * Heap Module
 * Per-process arena heaps, terms and deep-copy message transfer
 */

pub mod arena;
pub mod copy;
pub mod gc;
pub mod scratch;
pub mod types;
pub mod value;

pub use arena::ArenaHeap;
pub use copy::{copy_counted, deep_copy, Copied};
pub use scratch::with_scratch;
pub use types::{
    Boxed, GcStats, HeapError, HeapResult, HeapStats, Region, ReleaseStats, Term, TermKind,
};
pub use value::{CodecError, Value};
