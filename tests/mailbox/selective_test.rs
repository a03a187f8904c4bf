/*!
 * Selective Receive Tests
 * Pattern matching through running processes
 */

use lwp_kernel::{
    handler, Delivery, Next, ProcessError, Receive, Runtime, SchemaId, SpawnOptions, Value,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;

const X: SchemaId = SchemaId(1);
const Y: SchemaId = SchemaId(2);
const Z: SchemaId = SchemaId(3);

#[test]
fn test_selective_receive_leaves_others_in_order() {
    let runtime = Runtime::builder().manual().build().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    let pid = runtime
        .spawn(
            handler(move |_ctx, state, delivery| match delivery {
                Delivery::Start => Ok(Next::receive(state, Receive::tag(Y))),
                Delivery::Message(message) => {
                    sink.lock().push(message.tag());
                    Ok(Next::Continue(state))
                }
                _ => Ok(Next::Continue(state)),
            }),
            &Value::Nil,
            SpawnOptions::new(),
        )
        .unwrap();
    runtime.run_until_idle(10);

    for tag in [X, Y, Z] {
        runtime.send(pid, tag, &Value::Nil).unwrap();
    }
    assert_eq!(runtime.process_info(pid).unwrap().mailbox_len, 3);

    runtime.run_until_idle(10);
    assert_eq!(*seen.lock(), vec![Some(Y), Some(X), Some(Z)]);
}

#[test]
fn test_non_matching_message_does_not_wake() {
    let runtime = Runtime::builder().manual().build().unwrap();
    let pid = runtime
        .spawn(
            handler(|_ctx, state, _delivery| Ok(Next::receive(state, Receive::tag(Y)))),
            &Value::Nil,
            SpawnOptions::new(),
        )
        .unwrap();
    runtime.run_until_idle(10);

    runtime.send(pid, X, &Value::Nil).unwrap();
    assert_eq!(runtime.run_until_idle(10), 0);
    assert_eq!(runtime.stats().wakeups, 0);

    runtime.send(pid, Y, &Value::Nil).unwrap();
    assert_eq!(runtime.run_until_idle(10), 1);
    assert_eq!(runtime.stats().wakeups, 1);
    assert_eq!(runtime.process_info(pid).unwrap().mailbox_len, 1);
}

#[test]
fn test_predicate_sees_payload() {
    let runtime = Runtime::builder().manual().build().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    let big_only = Receive::matching(|view| view.payload().as_int().map_or(false, |n| n > 10));
    let pid = runtime
        .spawn(
            handler(move |_ctx, state, delivery| {
                if let Delivery::Message(message) = delivery {
                    sink.lock().push(message.payload.as_int().unwrap_or(-1));
                }
                Ok(Next::receive(state, big_only.clone()))
            }),
            &Value::Nil,
            SpawnOptions::new(),
        )
        .unwrap();
    runtime.run_until_idle(10);

    for n in [1, 20, 3, 40] {
        runtime.send(pid, X, &Value::Int(n)).unwrap();
    }
    runtime.run_until_idle(10);

    assert_eq!(*seen.lock(), vec![20, 40]);
    assert_eq!(runtime.process_info(pid).unwrap().mailbox_len, 2);
}

#[test]
fn test_bounded_mailbox_reports_full() {
    let runtime = Runtime::builder().manual().build().unwrap();
    let pid = runtime
        .spawn(
            handler(|_ctx, state, _delivery| Ok(Next::receive(state, Receive::tag(Z)))),
            &Value::Nil,
            SpawnOptions::new().mailbox_capacity(2),
        )
        .unwrap();
    runtime.run_until_idle(10);

    runtime.send(pid, X, &Value::Nil).unwrap();
    runtime.send(pid, X, &Value::Nil).unwrap();
    assert_eq!(
        runtime.send(pid, X, &Value::Nil),
        Err(ProcessError::MailboxFull { pid, capacity: 2 })
    );
}
