/*!
 * Scheduler Fairness Tests
 * Reduction-based preemption and round-robin progress
 */

use lwp_kernel::{
    handler, Delivery, ExitReason, HandlerRef, Next, QuantumOutcome, Runtime, SchemaId,
    SpawnOptions, Term, Value,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const SPIN: SchemaId = SchemaId(1);
const WORK: i64 = 50;

/// Never blocks: every invocation re-sends itself a message
fn spinner() -> HandlerRef {
    handler(|ctx, state, _delivery| {
        ctx.consume(WORK);
        let me = ctx.self_pid();
        ctx.send(me, SPIN, Term::Nil)?;
        Ok(Next::Continue(state))
    })
}

fn manual_runtime() -> Runtime {
    Runtime::builder().manual().build().unwrap()
}

#[test]
fn test_spinner_is_preempted() {
    let runtime = manual_runtime();
    let pid = runtime
        .spawn(spinner(), &Value::Nil, SpawnOptions::new())
        .unwrap();

    assert_eq!(runtime.run_quantum(pid), QuantumOutcome::Preempted);
    assert_eq!(runtime.run_quantum(pid), QuantumOutcome::Preempted);
    assert!(runtime.is_alive(pid));

    let stats = runtime.stats();
    assert_eq!(stats.preemptions, 2);
    assert_eq!(stats.quanta, 2);
}

#[test]
fn test_busy_processes_alternate() {
    let runtime = manual_runtime();
    let a = runtime
        .spawn(spinner(), &Value::Nil, SpawnOptions::new())
        .unwrap();
    let b = runtime
        .spawn(spinner(), &Value::Nil, SpawnOptions::new())
        .unwrap();

    assert_eq!(runtime.run_until_idle(20), 20);

    let info_a = runtime.process_info(a).unwrap();
    let info_b = runtime.process_info(b).unwrap();
    assert_eq!(info_a.quanta, 10);
    assert_eq!(info_b.quanta, 10);
}

#[test]
fn test_reductions_bounded_per_quantum() {
    let runtime = manual_runtime();
    let allowance = runtime.config().reductions_per_quantum as u64;
    let pid = runtime
        .spawn(spinner(), &Value::Nil, SpawnOptions::new())
        .unwrap();

    runtime.run_until_idle(5);

    let info = runtime.process_info(pid).unwrap();
    assert_eq!(info.quanta, 5);
    // One invocation may overdraw by at most its own cost
    let per_invocation = WORK as u64 + 16;
    assert!(info.reductions >= 5 * allowance);
    assert!(info.reductions <= 5 * (allowance + per_invocation));
}

#[test]
fn test_late_spawn_not_starved() {
    let runtime = manual_runtime();
    runtime
        .spawn(spinner(), &Value::Nil, SpawnOptions::new())
        .unwrap();
    runtime
        .spawn(spinner(), &Value::Nil, SpawnOptions::new())
        .unwrap();
    runtime.run_until_idle(7);

    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let late = runtime
        .spawn(
            handler(move |_ctx, _state, _delivery| {
                flag.store(true, Ordering::SeqCst);
                Ok(Next::stop())
            }),
            &Value::Nil,
            SpawnOptions::new(),
        )
        .unwrap();

    // Two spinners ahead of it in the queue
    runtime.run_until_idle(3);
    assert!(ran.load(Ordering::SeqCst));
    assert!(!runtime.is_alive(late));
}

#[test]
fn test_yield_requeues_with_resume() {
    let runtime = manual_runtime();
    let resumed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&resumed);

    let pid = runtime
        .spawn(
            handler(move |_ctx, state, delivery| match delivery {
                Delivery::Start => Ok(Next::Yield(state)),
                Delivery::Resume => {
                    flag.store(true, Ordering::SeqCst);
                    Ok(Next::stop())
                }
                _ => Ok(Next::Continue(state)),
            }),
            &Value::Nil,
            SpawnOptions::new(),
        )
        .unwrap();

    assert_eq!(runtime.run_quantum(pid), QuantumOutcome::Yielded);
    assert!(!resumed.load(Ordering::SeqCst));
    assert_eq!(
        runtime.run_quantum(pid),
        QuantumOutcome::Exited(ExitReason::Normal)
    );
    assert!(resumed.load(Ordering::SeqCst));
    assert_eq!(runtime.stats().yields, 1);
}
