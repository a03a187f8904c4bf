/*!
 * Receive Timeout Tests
 */

use lwp_kernel::{
    handler, Delivery, ExitReason, HandlerRef, Next, ProcessState, Receive, Runtime, SchemaId,
    SpawnOptions, Value,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const PING: SchemaId = SchemaId(20);
const OTHER: SchemaId = SchemaId(21);

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Message(i64),
    Timeout,
}

fn waiter(log: Arc<Mutex<Vec<Seen>>>, timeout: Duration) -> HandlerRef {
    handler(move |_ctx, state, delivery| {
        match delivery {
            Delivery::Message(message) => {
                log.lock().push(Seen::Message(message.payload.as_int().unwrap_or(-1)))
            }
            Delivery::Timeout => log.lock().push(Seen::Timeout),
            _ => {}
        }
        Ok(Next::receive(state, Receive::tag(PING).with_timeout(timeout)))
    })
}

#[test]
fn test_timeout_fires_when_nothing_matches() {
    let runtime = Runtime::builder().manual().build().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let pid = runtime
        .spawn(
            waiter(Arc::clone(&log), Duration::from_millis(20)),
            &Value::Nil,
            SpawnOptions::new(),
        )
        .unwrap();

    runtime.run_until_idle(10);
    runtime.send(pid, OTHER, &Value::Int(1)).unwrap();
    runtime.run_until_idle(10);
    assert_eq!(runtime.process_info(pid).unwrap().state, ProcessState::Blocked);
    assert!(log.lock().is_empty());

    std::thread::sleep(Duration::from_millis(30));
    runtime.run_until_idle(10);

    assert_eq!(log.lock().first(), Some(&Seen::Timeout));
    assert_eq!(runtime.stats().timeouts, 1);
    // The unmatched message is still queued
    assert_eq!(runtime.process_info(pid).unwrap().mailbox_len, 1);
}

#[test]
fn test_stale_timer_is_ignored() {
    let runtime = Runtime::builder().manual().build().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let pid = runtime
        .spawn(
            waiter(Arc::clone(&log), Duration::from_millis(20)),
            &Value::Nil,
            SpawnOptions::new(),
        )
        .unwrap();
    runtime.run_until_idle(10);

    // Satisfied before the deadline; the next block arms a fresh timer
    runtime.send(pid, PING, &Value::Int(5)).unwrap();
    runtime.run_until_idle(10);
    assert_eq!(*log.lock(), vec![Seen::Message(5)]);

    std::thread::sleep(Duration::from_millis(30));
    runtime.run_until_idle(10);

    // Only the re-armed wait expires; the first timer is dropped
    assert_eq!(*log.lock(), vec![Seen::Message(5), Seen::Timeout]);
    assert_eq!(runtime.stats().timeouts, 1);
}

#[test]
fn test_timeout_with_worker_threads() {
    let runtime = Runtime::builder()
        .workers(2)
        .idle_park(Duration::from_millis(1))
        .build()
        .unwrap();
    let pid = runtime
        .spawn(
            handler(|_ctx, state, delivery| match delivery {
                Delivery::Timeout => Ok(Next::stop()),
                _ => Ok(Next::receive(
                    state,
                    Receive::tag(PING).with_timeout(Duration::from_millis(10)),
                )),
            }),
            &Value::Int(0),
            SpawnOptions::new(),
        )
        .unwrap();

    let reason = runtime.wait_exit(pid, Duration::from_secs(5));
    assert_eq!(reason, Some(ExitReason::Normal));
}

#[test]
fn test_message_disarms_pending_timer() {
    let runtime = Runtime::builder().manual().build().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let pid = runtime
        .spawn(
            waiter(Arc::clone(&log), Duration::from_secs(3600)),
            &Value::Nil,
            SpawnOptions::new(),
        )
        .unwrap();
    runtime.run_until_idle(10);
    assert_eq!(runtime.stats().pending_timers, 1);

    // Each message satisfies the wait; only the re-armed timer stays pending
    for i in 0..500 {
        runtime.send(pid, PING, &Value::Int(i)).unwrap();
        runtime.run_until_idle(10);
    }

    assert_eq!(log.lock().len(), 500);
    assert_eq!(runtime.stats().pending_timers, 1);
    assert_eq!(runtime.scheduler().timers().len(), 1);
    assert!(runtime.scheduler().timers().capacity_used() < 500);
}
