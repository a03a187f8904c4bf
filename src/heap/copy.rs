/*!
 * Deep Copy
 * Moves term graphs between heaps without sharing storage
 */

use super::arena::{ArenaHeap, WORD_BYTES};
use super::scratch::with_scratch;
use super::types::{Boxed, HeapResult, Term};
use bumpalo::collections::Vec as ScratchVec;

/// Result of a deep copy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Copied {
    pub term: Term,
    /// Slots plus byte-words written into the destination
    pub words: usize,
}

/// Slot of a destination container still waiting for its child
#[derive(Clone, Copy)]
struct PendingSlot {
    parent: Boxed,
    index: usize,
    source: Term,
}

/// Copy `term` from `src` into `dst`
///
/// The source heap is only read. Shared subterms are copied once per
/// reference, so the result never aliases anything in `src`.
pub fn deep_copy(src: &ArenaHeap, term: Term, dst: &mut ArenaHeap) -> HeapResult<Term> {
    copy_counted(src, term, dst).map(|copied| copied.term)
}

/// Copy `term` and report how many words were written
///
/// Traversal is iterative: containers are reserved first and their boxed
/// children are queued on a scratch stack, so nesting depth never touches
/// the native stack.
pub fn copy_counted(src: &ArenaHeap, term: Term, dst: &mut ArenaHeap) -> HeapResult<Copied> {
    src.check_term(term)?;
    if term.is_immediate() {
        return Ok(Copied { term, words: 0 });
    }

    with_scratch(|arena| {
        let mut pending = ScratchVec::new_in(arena);
        let mut words = 0;

        let root = copy_node(src, term, dst, &mut pending, &mut words)?;
        while let Some(slot) = pending.pop() {
            let child = copy_node(src, slot.source, dst, &mut pending, &mut words)?;
            dst.write_word(&slot.parent, slot.index, child)?;
        }

        Ok(Copied { term: root, words })
    })
}

/// Copy one node; boxed children of containers are deferred
fn copy_node(
    src: &ArenaHeap,
    term: Term,
    dst: &mut ArenaHeap,
    pending: &mut ScratchVec<'_, PendingSlot>,
    words: &mut usize,
) -> HeapResult<Term> {
    let Some(boxed) = term.boxed() else {
        return Ok(term);
    };

    if term.is_bytes() {
        let data = src.byte_slice(&boxed)?;
        let target = dst.reserve_bytes(data.len())?;
        dst.byte_slice_mut(&target)?.copy_from_slice(data);
        *words += data.len().div_ceil(WORD_BYTES);
        return Ok(term.with_boxed(target));
    }

    let slots = src.word_slice(&boxed)?;
    let target = dst.reserve_words(slots.len())?;
    for (index, slot) in slots.iter().enumerate() {
        if slot.is_immediate() {
            dst.write_word(&target, index, *slot)?;
        } else {
            pending.push(PendingSlot {
                parent: target,
                index,
                source: *slot,
            });
        }
    }
    *words += slots.len();
    Ok(term.with_boxed(target))
}
