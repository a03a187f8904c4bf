/*!
 * Heap Types
 * Terms, addresses, statistics and errors for process arenas
 */

use crate::core::types::{HeapId, Pid, Ref};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Heap operation result
pub type HeapResult<T> = Result<T, HeapError>;

/// Heap errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum HeapError {
    #[error("Out of memory: requested {requested} bytes, limit {limit} bytes ({used} used)")]
    #[diagnostic(
        code(heap::out_of_memory),
        help("The process heap hit its limit. Raise max_heap_bytes or drop data from the process state.")
    )]
    OutOfMemory {
        requested: usize,
        limit: usize,
        used: usize,
    },

    #[error("Term belongs to heap {term_heap}, not heap {heap}")]
    #[diagnostic(
        code(heap::foreign_term),
        help("Terms never cross heaps. Copy the value into this heap first.")
    )]
    ForeignTerm { heap: HeapId, term_heap: HeapId },

    #[error("Term from epoch {term_epoch} used after heap moved to epoch {epoch}")]
    #[diagnostic(
        code(heap::stale_term),
        help("The heap was released or collected; terms held across that point are invalid.")
    )]
    StaleTerm { epoch: u32, term_epoch: u32 },

    #[error("Invalid term address: segment {segment}, offset {offset}, length {len}")]
    #[diagnostic(code(heap::invalid_term))]
    InvalidTerm { segment: u32, offset: u32, len: u32 },

    #[error("Type mismatch: expected {expected}, found {found}")]
    #[diagnostic(code(heap::type_mismatch))]
    TypeMismatch { expected: TermKind, found: TermKind },

    #[error("Index {index} out of bounds for length {len}")]
    #[diagnostic(code(heap::index_out_of_bounds))]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Atom text is not valid UTF-8")]
    #[diagnostic(code(heap::invalid_atom))]
    InvalidAtom,
}

/// Kind of a term, used for diagnostics and dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    Nil,
    Bool,
    Int,
    Float,
    Pid,
    Ref,
    Atom,
    Binary,
    Tuple,
    List,
    Map,
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TermKind::Nil => "nil",
            TermKind::Bool => "bool",
            TermKind::Int => "int",
            TermKind::Float => "float",
            TermKind::Pid => "pid",
            TermKind::Ref => "ref",
            TermKind::Atom => "atom",
            TermKind::Binary => "binary",
            TermKind::Tuple => "tuple",
            TermKind::List => "list",
            TermKind::Map => "map",
        };
        f.write_str(name)
    }
}

/// Address of boxed data inside one heap
///
/// Carries the owning heap's identity and epoch so that a term can never be
/// resolved against another process's heap, or against its own heap after a
/// release or collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boxed {
    pub(crate) heap: HeapId,
    pub(crate) epoch: u32,
    pub(crate) segment: u32,
    pub(crate) offset: u32,
    pub(crate) len: u32,
}

impl Boxed {
    /// Number of slots (containers) or bytes (atoms, binaries)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub const fn heap_id(&self) -> HeapId {
        self.heap
    }
}

/// A term living in a process heap
///
/// Immediates are stored inline; everything else is a [`Boxed`] address into
/// the heap that created it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Term {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Pid(Pid),
    Ref(Ref),
    Atom(Boxed),
    Binary(Boxed),
    Tuple(Boxed),
    List(Boxed),
    Map(Boxed),
}

impl Term {
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> TermKind {
        match self {
            Term::Nil => TermKind::Nil,
            Term::Bool(_) => TermKind::Bool,
            Term::Int(_) => TermKind::Int,
            Term::Float(_) => TermKind::Float,
            Term::Pid(_) => TermKind::Pid,
            Term::Ref(_) => TermKind::Ref,
            Term::Atom(_) => TermKind::Atom,
            Term::Binary(_) => TermKind::Binary,
            Term::Tuple(_) => TermKind::Tuple,
            Term::List(_) => TermKind::List,
            Term::Map(_) => TermKind::Map,
        }
    }

    /// Immediates need no heap storage and copy by value
    #[inline(always)]
    #[must_use]
    pub const fn is_immediate(&self) -> bool {
        self.boxed().is_none()
    }

    #[inline]
    #[must_use]
    pub const fn boxed(&self) -> Option<Boxed> {
        match self {
            Term::Atom(b) | Term::Binary(b) | Term::Tuple(b) | Term::List(b) | Term::Map(b) => {
                Some(*b)
            }
            _ => None,
        }
    }

    /// Rebuild a boxed term of the same kind at a new address
    #[inline]
    pub(crate) fn with_boxed(&self, boxed: Boxed) -> Term {
        match self {
            Term::Atom(_) => Term::Atom(boxed),
            Term::Binary(_) => Term::Binary(boxed),
            Term::Tuple(_) => Term::Tuple(boxed),
            Term::List(_) => Term::List(boxed),
            Term::Map(_) => Term::Map(boxed),
            other => *other,
        }
    }

    /// Byte-backed terms live in byte segments, containers in word segments
    #[inline]
    pub(crate) const fn is_bytes(&self) -> bool {
        matches!(self, Term::Atom(_) | Term::Binary(_))
    }

    #[inline]
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Term::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_pid(&self) -> Option<Pid> {
        match self {
            Term::Pid(p) => Some(*p),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_reference(&self) -> Option<Ref> {
        match self {
            Term::Ref(r) => Some(*r),
            _ => None,
        }
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Int(value)
    }
}

impl From<bool> for Term {
    fn from(value: bool) -> Self {
        Term::Bool(value)
    }
}

impl From<Pid> for Term {
    fn from(value: Pid) -> Self {
        Term::Pid(value)
    }
}

/// Raw byte region handed out by `ArenaHeap::allocate`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region(pub(crate) Boxed);

impl Region {
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// View the region as a binary term
    #[inline]
    #[must_use]
    pub const fn as_term(&self) -> Term {
        Term::Binary(self.0)
    }
}

/// Heap statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HeapStats {
    pub heap_id: HeapId,
    pub epoch: u32,
    pub segments: usize,
    pub used_bytes: usize,
    pub capacity_bytes: usize,
    pub limit_bytes: usize,
    pub allocations: u64,
    pub collections: u64,
    pub released_bytes: u64,
}

/// Result of `release_all`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseStats {
    pub segments: usize,
    pub bytes: usize,
}

/// Result of a process-local collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcStats {
    pub before_bytes: usize,
    pub after_bytes: usize,
    pub copied_words: usize,
}

impl GcStats {
    #[inline]
    #[must_use]
    pub const fn reclaimed_bytes(&self) -> usize {
        self.before_bytes.saturating_sub(self.after_bytes)
    }
}
