/*!
 * Process-Local Collection
 * Copying collection of one heap from an explicit root set
 */

use super::arena::ArenaHeap;
use super::copy::copy_counted;
use super::types::{GcStats, HeapResult, Term};
use log::debug;

impl ArenaHeap {
    /// Copy everything reachable from `roots` into fresh segments
    ///
    /// Roots are rewritten in place. The heap keeps its identity but moves to
    /// a new epoch, so any term not passed as a root is stale afterwards. On
    /// failure the heap and roots are left exactly as they were.
    pub fn collect(&mut self, roots: &mut [Term]) -> HeapResult<GcStats> {
        let before = self.used_bytes();
        let fresh = self.successor();
        let from = std::mem::replace(self, fresh);

        let mut copied_words = 0;
        let mut moved = Vec::with_capacity(roots.len());
        for root in roots.iter() {
            match copy_counted(&from, *root, self) {
                Ok(copied) => {
                    copied_words += copied.words;
                    moved.push(copied.term);
                }
                Err(e) => {
                    *self = from;
                    return Err(e);
                }
            }
        }
        roots.copy_from_slice(&moved);

        let after = self.used_bytes();
        self.collections += 1;
        self.released += before.saturating_sub(after) as u64;

        debug!(
            "Heap {} collected: {} -> {} bytes ({} words live)",
            self.id(),
            before,
            after,
            copied_words
        );

        Ok(GcStats {
            before_bytes: before,
            after_bytes: after,
            copied_words,
        })
    }
}
