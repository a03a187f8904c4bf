/*!
 * Arena Heap
 * Segmented bump allocation owned by exactly one process
 */

use super::types::{
    Boxed, HeapError, HeapResult, HeapStats, Region, ReleaseStats, Term, TermKind,
};
use crate::core::id::next_heap_id;
use crate::core::limits::{
    DEFAULT_MAX_HEAP_BYTES, FRAGMENT_SEGMENT_BYTES, FRAGMENT_SEGMENT_WORDS, SEGMENT_BYTES,
    SEGMENT_WORDS,
};
use crate::core::types::HeapId;
use log::trace;
use std::mem::size_of;

/// Accounting size of one term slot
pub(crate) const WORD_BYTES: usize = size_of::<Term>();

/// Per-process arena
///
/// Containers (tuples, lists, maps) are stored as runs of term slots in word
/// segments; atoms and binaries as runs of bytes in byte segments. Allocation
/// only ever bumps the tail of the newest segment. Nothing is freed
/// individually: `release_all` drops every segment at once and `collect`
/// copies the live data into fresh segments.
pub struct ArenaHeap {
    id: HeapId,
    epoch: u32,
    words: Vec<Vec<Term>>,
    bytes: Vec<Vec<u8>>,
    limit: usize,
    used: usize,
    segment_words: usize,
    segment_bytes: usize,
    allocations: u64,
    pub(super) collections: u64,
    pub(super) released: u64,
}

impl ArenaHeap {
    /// Create a heap with the default limit
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_HEAP_BYTES)
    }

    /// Create a heap that refuses to grow past `limit` bytes
    pub fn with_limit(limit: usize) -> Self {
        Self {
            id: next_heap_id(),
            epoch: 0,
            words: Vec::new(),
            bytes: Vec::new(),
            limit,
            used: 0,
            segment_words: SEGMENT_WORDS,
            segment_bytes: SEGMENT_BYTES,
            allocations: 0,
            collections: 0,
            released: 0,
        }
    }

    /// Heap for one in-flight message
    ///
    /// Uses small segments since a fragment holds a single payload and is
    /// dropped as soon as the receiver has copied it out.
    pub fn fragment(limit: usize) -> Self {
        Self {
            segment_words: FRAGMENT_SEGMENT_WORDS,
            segment_bytes: FRAGMENT_SEGMENT_BYTES,
            ..Self::with_limit(limit)
        }
    }

    /// Empty heap with the same identity and the next epoch
    pub(super) fn successor(&self) -> Self {
        Self {
            id: self.id,
            epoch: self.epoch.wrapping_add(1),
            words: Vec::new(),
            bytes: Vec::new(),
            limit: self.limit,
            used: 0,
            segment_words: self.segment_words,
            segment_bytes: self.segment_bytes,
            allocations: self.allocations,
            collections: self.collections,
            released: self.released,
        }
    }

    #[inline]
    pub fn id(&self) -> HeapId {
        self.id
    }

    #[inline]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    #[inline]
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.words.len() + self.bytes.len()
    }

    pub fn capacity_bytes(&self) -> usize {
        let words: usize = self.words.iter().map(|s| s.capacity() * WORD_BYTES).sum();
        let bytes: usize = self.bytes.iter().map(Vec::capacity).sum();
        words + bytes
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            heap_id: self.id,
            epoch: self.epoch,
            segments: self.segment_count(),
            used_bytes: self.used,
            capacity_bytes: self.capacity_bytes(),
            limit_bytes: self.limit,
            allocations: self.allocations,
            collections: self.collections,
            released_bytes: self.released,
        }
    }

    /// Discard every segment in one step
    ///
    /// Every term that pointed into this heap becomes stale.
    pub fn release_all(&mut self) -> ReleaseStats {
        let stats = ReleaseStats {
            segments: self.segment_count(),
            bytes: self.capacity_bytes(),
        };
        self.words = Vec::new();
        self.bytes = Vec::new();
        self.used = 0;
        self.epoch = self.epoch.wrapping_add(1);
        self.released += stats.bytes as u64;
        trace!(
            "Heap {} released {} segments ({} bytes)",
            self.id,
            stats.segments,
            stats.bytes
        );
        stats
    }

    // ------------------------------------------------------------------
    // Raw allocation
    // ------------------------------------------------------------------

    fn charge(&mut self, requested: usize) -> HeapResult<()> {
        if requested > u32::MAX as usize || self.used.saturating_add(requested) > self.limit {
            return Err(HeapError::OutOfMemory {
                requested,
                limit: self.limit,
                used: self.used,
            });
        }
        self.used += requested;
        self.allocations += 1;
        Ok(())
    }

    fn host_oom(&self, requested: usize) -> HeapError {
        HeapError::OutOfMemory {
            requested,
            limit: self.limit,
            used: self.used,
        }
    }

    /// Reserve `n` term slots, initialised to nil
    pub(crate) fn reserve_words(&mut self, n: usize) -> HeapResult<Boxed> {
        let requested = n.saturating_mul(WORD_BYTES);
        self.charge(requested)?;

        let needs_segment = self
            .words
            .last()
            .map_or(true, |s| s.capacity() - s.len() < n);
        if needs_segment {
            let mut segment = Vec::new();
            if segment.try_reserve_exact(n.max(self.segment_words)).is_err() {
                self.used -= requested;
                return Err(self.host_oom(requested));
            }
            self.words.push(segment);
        }

        let index = self.words.len() - 1;
        let segment = &mut self.words[index];
        let offset = segment.len();
        segment.resize(offset + n, Term::Nil);

        Ok(Boxed {
            heap: self.id,
            epoch: self.epoch,
            segment: index as u32,
            offset: offset as u32,
            len: n as u32,
        })
    }

    /// Reserve `n` zeroed bytes
    pub(crate) fn reserve_bytes(&mut self, n: usize) -> HeapResult<Boxed> {
        self.charge(n)?;

        let needs_segment = self
            .bytes
            .last()
            .map_or(true, |s| s.capacity() - s.len() < n);
        if needs_segment {
            let mut segment = Vec::new();
            if segment.try_reserve_exact(n.max(self.segment_bytes)).is_err() {
                self.used -= n;
                return Err(self.host_oom(n));
            }
            self.bytes.push(segment);
        }

        let index = self.bytes.len() - 1;
        let segment = &mut self.bytes[index];
        let offset = segment.len();
        segment.resize(offset + n, 0);

        Ok(Boxed {
            heap: self.id,
            epoch: self.epoch,
            segment: index as u32,
            offset: offset as u32,
            len: n as u32,
        })
    }

    /// Bump-allocate a raw byte region
    pub fn allocate(&mut self, size: usize) -> HeapResult<Region> {
        self.reserve_bytes(size).map(Region)
    }

    pub fn region(&self, region: &Region) -> HeapResult<&[u8]> {
        self.byte_slice(&region.0)
    }

    pub fn region_mut(&mut self, region: &Region) -> HeapResult<&mut [u8]> {
        self.byte_slice_mut(&region.0)
    }

    // ------------------------------------------------------------------
    // Address validation
    // ------------------------------------------------------------------

    #[inline]
    fn check_owner(&self, boxed: &Boxed) -> HeapResult<()> {
        if boxed.heap != self.id {
            return Err(HeapError::ForeignTerm {
                heap: self.id,
                term_heap: boxed.heap,
            });
        }
        if boxed.epoch != self.epoch {
            return Err(HeapError::StaleTerm {
                epoch: self.epoch,
                term_epoch: boxed.epoch,
            });
        }
        Ok(())
    }

    fn invalid(boxed: &Boxed) -> HeapError {
        HeapError::InvalidTerm {
            segment: boxed.segment,
            offset: boxed.offset,
            len: boxed.len,
        }
    }

    /// Check that a term may be stored in or read from this heap
    pub fn check_term(&self, term: Term) -> HeapResult<()> {
        match term.boxed() {
            None => Ok(()),
            Some(boxed) if term.is_bytes() => self.byte_slice(&boxed).map(|_| ()),
            Some(boxed) => self.word_slice(&boxed).map(|_| ()),
        }
    }

    /// True if the term is an immediate or a live term of this heap
    pub fn owns(&self, term: Term) -> bool {
        self.check_term(term).is_ok()
    }

    pub(crate) fn word_slice(&self, boxed: &Boxed) -> HeapResult<&[Term]> {
        self.check_owner(boxed)?;
        let start = boxed.offset as usize;
        let end = start + boxed.len as usize;
        self.words
            .get(boxed.segment as usize)
            .and_then(|s| s.get(start..end))
            .ok_or_else(|| Self::invalid(boxed))
    }

    pub(crate) fn byte_slice(&self, boxed: &Boxed) -> HeapResult<&[u8]> {
        self.check_owner(boxed)?;
        let start = boxed.offset as usize;
        let end = start + boxed.len as usize;
        self.bytes
            .get(boxed.segment as usize)
            .and_then(|s| s.get(start..end))
            .ok_or_else(|| Self::invalid(boxed))
    }

    pub(crate) fn byte_slice_mut(&mut self, boxed: &Boxed) -> HeapResult<&mut [u8]> {
        self.check_owner(boxed)?;
        let start = boxed.offset as usize;
        let end = start + boxed.len as usize;
        self.bytes
            .get_mut(boxed.segment as usize)
            .and_then(|s| s.get_mut(start..end))
            .ok_or_else(|| Self::invalid(boxed))
    }

    /// Fill one slot of a freshly reserved container
    pub(crate) fn write_word(&mut self, boxed: &Boxed, index: usize, term: Term) -> HeapResult<()> {
        self.check_owner(boxed)?;
        if index >= boxed.len as usize {
            return Err(HeapError::IndexOutOfBounds {
                index,
                len: boxed.len as usize,
            });
        }
        let slot = boxed.offset as usize + index;
        let cell = self
            .words
            .get_mut(boxed.segment as usize)
            .and_then(|s| s.get_mut(slot))
            .ok_or_else(|| Self::invalid(boxed))?;
        *cell = term;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    pub fn alloc_binary(&mut self, data: &[u8]) -> HeapResult<Term> {
        let boxed = self.reserve_bytes(data.len())?;
        self.byte_slice_mut(&boxed)?.copy_from_slice(data);
        Ok(Term::Binary(boxed))
    }

    pub fn alloc_atom(&mut self, name: &str) -> HeapResult<Term> {
        let boxed = self.reserve_bytes(name.len())?;
        self.byte_slice_mut(&boxed)?.copy_from_slice(name.as_bytes());
        Ok(Term::Atom(boxed))
    }

    fn alloc_container(&mut self, elements: &[Term]) -> HeapResult<Boxed> {
        for element in elements {
            self.check_term(*element)?;
        }
        let boxed = self.reserve_words(elements.len())?;
        let start = boxed.offset as usize;
        let segment = &mut self.words[boxed.segment as usize];
        segment[start..start + elements.len()].copy_from_slice(elements);
        Ok(boxed)
    }

    pub fn alloc_tuple(&mut self, elements: &[Term]) -> HeapResult<Term> {
        self.alloc_container(elements).map(Term::Tuple)
    }

    pub fn alloc_list(&mut self, elements: &[Term]) -> HeapResult<Term> {
        self.alloc_container(elements).map(Term::List)
    }

    /// Maps are stored as alternating key/value slots in insertion order
    pub fn alloc_map(&mut self, entries: &[(Term, Term)]) -> HeapResult<Term> {
        let flat: Vec<Term> = entries.iter().flat_map(|(k, v)| [*k, *v]).collect();
        self.alloc_container(&flat).map(Term::Map)
    }

    // ------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------

    fn mismatch(expected: TermKind, term: Term) -> HeapError {
        HeapError::TypeMismatch {
            expected,
            found: term.kind(),
        }
    }

    pub fn binary(&self, term: Term) -> HeapResult<&[u8]> {
        match term {
            Term::Binary(b) => self.byte_slice(&b),
            other => Err(Self::mismatch(TermKind::Binary, other)),
        }
    }

    /// Destructive update; only binaries are mutable
    pub fn binary_mut(&mut self, term: Term) -> HeapResult<&mut [u8]> {
        match term {
            Term::Binary(b) => self.byte_slice_mut(&b),
            other => Err(Self::mismatch(TermKind::Binary, other)),
        }
    }

    pub fn atom(&self, term: Term) -> HeapResult<&str> {
        match term {
            Term::Atom(b) => {
                std::str::from_utf8(self.byte_slice(&b)?).map_err(|_| HeapError::InvalidAtom)
            }
            other => Err(Self::mismatch(TermKind::Atom, other)),
        }
    }

    /// True if `term` is the atom `name`
    pub fn is_atom(&self, term: Term, name: &str) -> bool {
        self.atom(term).map_or(false, |a| a == name)
    }

    pub fn tuple(&self, term: Term) -> HeapResult<&[Term]> {
        match term {
            Term::Tuple(b) => self.word_slice(&b),
            other => Err(Self::mismatch(TermKind::Tuple, other)),
        }
    }

    pub fn list(&self, term: Term) -> HeapResult<&[Term]> {
        match term {
            Term::List(b) => self.word_slice(&b),
            other => Err(Self::mismatch(TermKind::List, other)),
        }
    }

    pub fn map_entries(&self, term: Term) -> HeapResult<Vec<(Term, Term)>> {
        match term {
            Term::Map(b) => Ok(self
                .word_slice(&b)?
                .chunks_exact(2)
                .map(|pair| (pair[0], pair[1]))
                .collect()),
            other => Err(Self::mismatch(TermKind::Map, other)),
        }
    }

    /// Look up a key by structural equality
    pub fn map_get(&self, map: Term, key: Term) -> HeapResult<Option<Term>> {
        for (k, v) in self.map_entries(map)? {
            if self.equal(k, key)? {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    pub fn element(&self, tuple: Term, index: usize) -> HeapResult<Term> {
        let elements = self.tuple(tuple)?;
        elements
            .get(index)
            .copied()
            .ok_or(HeapError::IndexOutOfBounds {
                index,
                len: elements.len(),
            })
    }

    /// Copy of `tuple` with one element replaced
    pub fn update_element(&mut self, tuple: Term, index: usize, value: Term) -> HeapResult<Term> {
        let mut elements = self.tuple(tuple)?.to_vec();
        let len = elements.len();
        let slot = elements
            .get_mut(index)
            .ok_or(HeapError::IndexOutOfBounds { index, len })?;
        *slot = value;
        self.alloc_tuple(&elements)
    }

    /// Structural equality of two terms of this heap
    pub fn equal(&self, a: Term, b: Term) -> HeapResult<bool> {
        let mut pending = vec![(a, b)];
        while let Some((x, y)) = pending.pop() {
            if x.kind() != y.kind() {
                return Ok(false);
            }
            match (x, y) {
                (Term::Atom(p), Term::Atom(q)) | (Term::Binary(p), Term::Binary(q)) => {
                    if self.byte_slice(&p)? != self.byte_slice(&q)? {
                        return Ok(false);
                    }
                }
                (Term::Tuple(p), Term::Tuple(q))
                | (Term::List(p), Term::List(q))
                | (Term::Map(p), Term::Map(q)) => {
                    let left = self.word_slice(&p)?;
                    let right = self.word_slice(&q)?;
                    if left.len() != right.len() {
                        return Ok(false);
                    }
                    pending.extend(left.iter().copied().zip(right.iter().copied()));
                }
                (x, y) => {
                    if x != y {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    /// Slots plus byte-words reachable from `term`, as deep copy would see it
    pub fn size_of(&self, term: Term) -> HeapResult<usize> {
        let mut total = 0;
        let mut pending = vec![term];
        while let Some(t) = pending.pop() {
            match t {
                Term::Atom(b) | Term::Binary(b) => {
                    total += self.byte_slice(&b)?.len().div_ceil(WORD_BYTES);
                }
                Term::Tuple(b) | Term::List(b) | Term::Map(b) => {
                    let slots = self.word_slice(&b)?;
                    total += slots.len();
                    pending.extend(slots.iter().copied().filter(|s| !s.is_immediate()));
                }
                _ => {}
            }
        }
        Ok(total)
    }
}

impl Default for ArenaHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ArenaHeap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaHeap")
            .field("id", &self.id)
            .field("epoch", &self.epoch)
            .field("segments", &self.segment_count())
            .field("used", &self.used)
            .field("limit", &self.limit)
            .finish()
    }
}
