/*!
 * Collection Tests
 * Per-process collection driven by the scheduler
 */

use lwp_kernel::heap::ArenaHeap;
use lwp_kernel::{
    handler, Delivery, HandlerRef, HeapError, Next, Receive, Runtime, SchemaId, SpawnOptions,
    Term, Value,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;

const CHURN: SchemaId = SchemaId(50);
const REPORT: SchemaId = SchemaId(51);

#[test]
fn test_scheduler_collects_garbage_and_keeps_state() {
    let runtime = Runtime::builder()
        .manual()
        .gc_min_threshold(16 * 1024)
        .build()
        .unwrap();
    let report = Arc::new(Mutex::new(None));

    let sink = Arc::clone(&report);
    let pid = runtime
        .spawn(
            handler(move |ctx, state, delivery| {
                let Delivery::Message(message) = delivery else {
                    return Ok(Next::Continue(state));
                };
                if message.tag() == Some(REPORT) {
                    *sink.lock() = Some(ctx.heap().export(state)?);
                    return Ok(Next::stop());
                }

                // 4KB of garbage per message; only the counter survives
                ctx.heap_mut().alloc_binary(&[0u8; 4096])?;
                let count = ctx.heap().element(state, 0)?.as_int().unwrap_or(0);
                let state = ctx.heap_mut().update_element(state, 0, Term::Int(count + 1))?;
                Ok(Next::receive(state, Receive::any()))
            }),
            &Value::tuple(vec![Value::Int(0), Value::text("keep me")]),
            SpawnOptions::new(),
        )
        .unwrap();

    for _ in 0..100 {
        runtime.send(pid, CHURN, &Value::Nil).unwrap();
    }
    runtime.run_until_idle(1_000);

    let heap = runtime.process_info(pid).unwrap().heap.unwrap();
    assert!(heap.collections > 0);
    assert!(heap.used_bytes < 100 * 4096);

    runtime.send(pid, REPORT, &Value::Nil).unwrap();
    runtime.run_until_idle(10);

    assert_eq!(
        *report.lock(),
        Some(Value::tuple(vec![Value::Int(100), Value::text("keep me")]))
    );
    let stats = runtime.stats();
    assert!(stats.collections > 0);
    assert!(stats.bytes_reclaimed > 0);
}

/// Allocates `garbage` bytes per message and keeps its state
fn churner(garbage: usize) -> HandlerRef {
    handler(move |ctx, state, delivery| {
        if let Delivery::Message(_) = delivery {
            ctx.heap_mut().alloc_binary(&vec![0u8; garbage])?;
        }
        Ok(Next::receive(state, Receive::any()))
    })
}

#[test]
fn test_heap_limit_below_threshold_still_collects() {
    // Default threshold (256KB) sits above this process's whole heap
    let runtime = Runtime::builder().manual().build().unwrap();
    let pid = runtime
        .spawn(
            churner(1024),
            &Value::Int(0),
            SpawnOptions::new().max_heap_bytes(64 * 1024),
        )
        .unwrap();

    for _ in 0..200 {
        runtime.send(pid, CHURN, &Value::Nil).unwrap();
    }
    runtime.run_until_idle(1_000);

    assert!(runtime.is_alive(pid), "died: {:?}", runtime.exit_reason(pid));
    let heap = runtime.process_info(pid).unwrap().heap.unwrap();
    assert!(heap.collections > 0);
    assert!(heap.used_bytes <= 64 * 1024);
}

#[test]
fn test_live_data_above_half_the_limit_keeps_collecting() {
    let runtime = Runtime::builder()
        .manual()
        .gc_min_threshold(16 * 1024)
        .build()
        .unwrap();
    let live = Value::binary(vec![7u8; 36 * 1024]);
    let pid = runtime
        .spawn(
            churner(1024),
            &live,
            SpawnOptions::new().max_heap_bytes(64 * 1024),
        )
        .unwrap();

    for _ in 0..100 {
        runtime.send(pid, CHURN, &Value::Nil).unwrap();
    }
    runtime.run_until_idle(1_000);

    assert!(runtime.is_alive(pid), "died: {:?}", runtime.exit_reason(pid));
    let heap = runtime.process_info(pid).unwrap().heap.unwrap();
    assert!(heap.collections >= 50);
}

#[test]
fn test_receive_collects_before_running_out_of_memory() {
    const BIG: SchemaId = SchemaId(52);

    let runtime = Runtime::builder().manual().build().unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));

    // 28KB of garbage stays under the 32KB threshold, but leaves no room
    // for a 40KB message until it is collected
    let sink = Arc::clone(&received);
    let pid = runtime
        .spawn(
            handler(move |ctx, state, delivery| {
                if let Delivery::Message(message) = delivery {
                    if message.tag() == Some(BIG) {
                        sink.lock().push(ctx.heap().binary(message.payload)?.len());
                    } else {
                        ctx.heap_mut().alloc_binary(&[0u8; 28 * 1024])?;
                    }
                }
                Ok(Next::receive(state, Receive::any()))
            }),
            &Value::Nil,
            SpawnOptions::new().max_heap_bytes(64 * 1024),
        )
        .unwrap();

    runtime.send(pid, CHURN, &Value::Nil).unwrap();
    runtime.run_until_idle(10);
    let before = runtime.process_info(pid).unwrap().heap.unwrap();
    assert_eq!(before.collections, 0);

    runtime
        .send(pid, BIG, &Value::binary(vec![1u8; 40 * 1024]))
        .unwrap();
    runtime.run_until_idle(10);

    assert!(runtime.is_alive(pid), "died: {:?}", runtime.exit_reason(pid));
    assert_eq!(*received.lock(), vec![40 * 1024]);
    assert!(runtime.process_info(pid).unwrap().heap.unwrap().collections > 0);
}

#[test]
fn test_terms_from_before_collection_are_stale() {
    let mut heap = ArenaHeap::new();
    let kept = heap.alloc_atom("kept").unwrap();
    let dropped = heap.alloc_atom("dropped").unwrap();

    let mut roots = [kept];
    heap.collect(&mut roots).unwrap();

    assert_eq!(heap.atom(roots[0]).unwrap(), "kept");
    assert!(matches!(heap.atom(dropped), Err(HeapError::StaleTerm { .. })));
    assert!(matches!(heap.atom(kept), Err(HeapError::StaleTerm { .. })));
}
