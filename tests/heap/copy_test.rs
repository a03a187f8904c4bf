/*!
 * Deep Copy Tests
 * Cross-heap copies, limits and stale references
 */

use lwp_kernel::heap::{copy_counted, deep_copy, ArenaHeap, HeapError, Term, Value};
use pretty_assertions::assert_eq;

fn sample() -> Value {
    Value::map(vec![
        (Value::atom("name"), Value::text("worker")),
        (
            Value::atom("jobs"),
            Value::list(vec![Value::Int(1), Value::Int(2), Value::Float(2.5)]),
        ),
        (
            Value::atom("nested"),
            Value::tuple(vec![Value::Bool(true), Value::binary(vec![0u8, 1, 2, 3])]),
        ),
    ])
}

#[test]
fn test_copy_between_heaps_is_equal_and_independent() {
    let mut src = ArenaHeap::new();
    let mut dst = ArenaHeap::new();
    let term = src.import(&sample()).unwrap();

    let copy = deep_copy(&src, term, &mut dst).unwrap();
    assert_eq!(dst.export(copy).unwrap(), sample());

    // Mutating the copy's binary leaves the source untouched
    let key = dst.alloc_atom("nested").unwrap();
    let nested = dst.map_get(copy, key).unwrap().unwrap();
    let blob = dst.element(nested, 1).unwrap();
    dst.binary_mut(blob).unwrap()[0] = 99;

    assert_eq!(src.export(term).unwrap(), sample());
}

#[test]
fn test_copied_term_belongs_to_destination_only() {
    let mut src = ArenaHeap::new();
    let mut dst = ArenaHeap::new();
    let term = src.alloc_tuple(&[Term::Int(1), Term::Int(2)]).unwrap();
    let copy = deep_copy(&src, term, &mut dst).unwrap();

    assert!(dst.owns(copy));
    assert!(!src.owns(copy));
    assert!(matches!(
        src.tuple(copy),
        Err(HeapError::ForeignTerm { .. })
    ));
}

#[test]
fn test_sharing_is_not_preserved() {
    let mut src = ArenaHeap::new();
    let mut dst = ArenaHeap::new();
    let shared = src.alloc_binary(&[5u8; 64]).unwrap();
    let pair = src.alloc_tuple(&[shared, shared]).unwrap();

    let copied = copy_counted(&src, pair, &mut dst).unwrap();
    let left = dst.element(copied.term, 0).unwrap();
    let right = dst.element(copied.term, 1).unwrap();

    // Two distinct binaries with equal contents
    assert_ne!(left, right);
    assert!(dst.equal(left, right).unwrap());
}

#[test]
fn test_copy_respects_destination_limit() {
    let mut src = ArenaHeap::new();
    let mut dst = ArenaHeap::with_limit(1024);
    let big = src.alloc_binary(&vec![1u8; 4096]).unwrap();

    let result = deep_copy(&src, big, &mut dst);
    assert!(matches!(result, Err(HeapError::OutOfMemory { .. })));
}

#[test]
fn test_immediates_copy_for_free() {
    let src = ArenaHeap::new();
    let mut dst = ArenaHeap::new();

    let copied = copy_counted(&src, Term::Int(42), &mut dst).unwrap();
    assert_eq!(copied.term, Term::Int(42));
    assert_eq!(copied.words, 0);
    assert_eq!(dst.used_bytes(), 0);
}

#[test]
fn test_value_codec_roundtrip_through_heap() {
    let mut heap = ArenaHeap::new();
    let term = heap.import(&sample()).unwrap();
    let exported = heap.export(term).unwrap();

    let bytes = exported.encode().unwrap();
    assert_eq!(Value::decode(&bytes).unwrap(), sample());
}
