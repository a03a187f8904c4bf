/*!
 * Call Tests
 * Host request/reply through ports
 */

use lwp_kernel::{
    handler, named, CallError, Delivery, ExitReason, HandlerRef, MessageKind, Next, Runtime,
    SchemaId, SpawnOptions, Value,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

const ECHO: SchemaId = SchemaId(70);
const TIMEOUT: Duration = Duration::from_secs(5);

fn echo_server() -> HandlerRef {
    named("echo", |ctx, state, delivery| {
        if let Delivery::Message(message) = delivery {
            if let (Some(from), Some(reference)) = (message.from, message.reference) {
                ctx.reply(from, reference, message.payload)?;
            }
        }
        Ok(Next::Continue(state))
    })
}

fn runtime() -> Runtime {
    Runtime::builder().workers(2).build().unwrap()
}

#[test]
fn test_call_returns_reply() {
    let runtime = runtime();
    let server = runtime
        .spawn(echo_server(), &Value::Nil, SpawnOptions::new())
        .unwrap();

    let request = Value::tuple(vec![Value::atom("ping"), Value::Int(7)]);
    let reply = runtime.call(server, ECHO, &request, TIMEOUT).unwrap();
    assert_eq!(reply, request);

    // Repeated calls each get their own reply
    for n in 0..10 {
        let reply = runtime.call(server, ECHO, &Value::Int(n), TIMEOUT).unwrap();
        assert_eq!(reply, Value::Int(n));
    }
}

#[test]
fn test_call_times_out_when_no_reply() {
    let runtime = runtime();
    let silent = runtime
        .spawn(
            handler(|_ctx, state, _delivery| Ok(Next::Continue(state))),
            &Value::Nil,
            SpawnOptions::new(),
        )
        .unwrap();

    let result = runtime.call(silent, ECHO, &Value::Nil, Duration::from_millis(50));
    assert_eq!(
        result,
        Err(CallError::Timeout {
            pid: silent,
            timeout_ms: 50
        })
    );
    assert!(runtime.is_alive(silent));
}

#[test]
fn test_call_to_dead_process_fails_fast() {
    let runtime = runtime();
    let pid = runtime
        .spawn(
            handler(|_ctx, _state, _delivery| Ok(Next::stop())),
            &Value::Nil,
            SpawnOptions::new(),
        )
        .unwrap();
    assert_eq!(runtime.wait_exit(pid, TIMEOUT), Some(ExitReason::Normal));

    let result = runtime.call(pid, ECHO, &Value::Nil, TIMEOUT);
    assert_eq!(result, Err(CallError::NoSuchProcess(pid)));
}

#[test]
fn test_call_reports_exit_before_reply() {
    let runtime = runtime();
    let quitter = runtime
        .spawn(
            handler(|_ctx, state, delivery| match delivery {
                Delivery::Message(_) => Ok(Next::Exit(ExitReason::shutdown("refused"))),
                _ => Ok(Next::Continue(state)),
            }),
            &Value::Nil,
            SpawnOptions::new(),
        )
        .unwrap();

    let result = runtime.call(quitter, ECHO, &Value::Nil, TIMEOUT);
    match result {
        Err(CallError::Exited { pid, reason }) => {
            assert_eq!(pid, quitter);
            assert!(reason.contains("refused"));
        }
        other => panic!("expected Exited, got {other:?}"),
    }
}

#[test]
fn test_port_receives_plain_sends() {
    let runtime = runtime();
    let port = runtime.open_port();
    let forwarder = runtime
        .spawn(
            handler(|ctx, state, delivery| {
                if let Delivery::Message(message) = delivery {
                    let target = ctx.heap().element(state, 0)?.as_pid().unwrap_or(ctx.self_pid());
                    ctx.send(target, ECHO, message.payload)?;
                }
                Ok(Next::Continue(state))
            }),
            &Value::tuple(vec![Value::Pid(port.pid())]),
            SpawnOptions::new(),
        )
        .unwrap();

    runtime.send(forwarder, ECHO, &Value::text("hi")).unwrap();
    let message = port.recv_timeout(TIMEOUT).unwrap();

    assert_eq!(message.from, Some(forwarder));
    assert_eq!(message.kind, MessageKind::User(ECHO));
    assert_eq!(message.value, Value::text("hi"));
    assert!(port.is_empty());
}

#[test]
fn test_closed_port_is_no_such_process() {
    let runtime = Runtime::builder().manual().build().unwrap();
    let port = runtime.open_port();
    let pid = port.pid();
    drop(port);

    assert_eq!(
        runtime.send(pid, ECHO, &Value::Nil),
        Err(lwp_kernel::ProcessError::NoSuchProcess(pid))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_call_async() {
    let runtime = runtime();
    let server = runtime
        .spawn(echo_server(), &Value::Nil, SpawnOptions::new())
        .unwrap();

    let reply = runtime
        .call_async(server, ECHO, &Value::atom("pong"), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(reply, Value::atom("pong"));

    let silent = runtime
        .spawn(
            handler(|_ctx, state, _delivery| Ok(Next::Continue(state))),
            &Value::Nil,
            SpawnOptions::new(),
        )
        .unwrap();
    let result = runtime
        .call_async(silent, ECHO, &Value::Nil, Duration::from_millis(20))
        .await;
    assert!(matches!(result, Err(CallError::Timeout { .. })));
}
