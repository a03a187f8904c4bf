/*!
 * Lightweight Process Kernel - Demo Entry Point
 *
 * Builds a runtime from the environment, passes a token around a ring of
 * processes and prints the scheduler statistics as JSON.
 *
 * Usage: lwp [RING_SIZE] [ROUNDS]
 */

use anyhow::{anyhow, Context as _, Result};
use lwp_kernel::monitoring::span_operation;
use lwp_kernel::{
    init_tracing, named, Delivery, ExitReason, Fault, HandlerRef, MessageKind, Next, Pid, Runtime,
    SchemaId, SpawnOptions, Term, Value,
};
use std::time::Duration;
use tracing::{info, warn};

/// Successor pid for a ring member
const SETUP: SchemaId = SchemaId(1);
/// `{hops_left, reporter}`
const TOKEN: SchemaId = SchemaId(2);
/// Final hop count, sent to the reporter
const DONE: SchemaId = SchemaId(3);

const DEFAULT_RING_SIZE: usize = 1_000;
const DEFAULT_ROUNDS: usize = 10;
const RING_TIMEOUT: Duration = Duration::from_secs(60);

fn relay() -> HandlerRef {
    named("ring_relay", |ctx, next, delivery| {
        let Delivery::Message(message) = delivery else {
            return Ok(Next::Continue(next));
        };

        match message.kind {
            MessageKind::User(SETUP) => Ok(Next::Continue(message.payload)),
            MessageKind::User(TOKEN) => {
                let hops = ctx.heap().element(message.payload, 0)?;
                let reporter = ctx.heap().element(message.payload, 1)?;
                let hops = hops.as_int().ok_or_else(|| Fault::new("hop count is not an int"))?;
                let reporter = reporter
                    .as_pid()
                    .ok_or_else(|| Fault::new("reporter is not a pid"))?;

                if hops == 0 {
                    ctx.send(reporter, DONE, Term::Int(0))?;
                } else {
                    let successor = next.as_pid().ok_or_else(|| Fault::new("ring not set up"))?;
                    let token = ctx
                        .heap_mut()
                        .alloc_tuple(&[Term::Int(hops - 1), Term::Pid(reporter)])?;
                    ctx.send(successor, TOKEN, token)?;
                }
                Ok(Next::Continue(next))
            }
            MessageKind::ExitRequest { reason, .. } => Ok(Next::Exit(reason)),
            _ => Ok(Next::Continue(next)),
        }
    })
}

fn parse_arg(index: usize, default: usize) -> Result<usize> {
    match std::env::args().nth(index) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("argument {index} must be a positive integer, got {raw:?}")),
        None => Ok(default),
    }
}

fn main() -> Result<()> {
    init_tracing();

    let ring_size = parse_arg(1, DEFAULT_RING_SIZE)?.max(1);
    let rounds = parse_arg(2, DEFAULT_ROUNDS)?;

    let runtime = Runtime::from_env().context("failed to start runtime")?;
    info!(
        workers = runtime.config().workers,
        ring_size, rounds, "Lightweight process kernel starting"
    );
    if runtime.config().workers == 0 {
        warn!("Manual mode: the ring is driven from the main thread");
    }

    let handler = relay();
    let members: Vec<Pid> = (0..ring_size)
        .map(|_| runtime.spawn(handler.clone(), &Value::Nil, SpawnOptions::new()))
        .collect::<Result<_, _>>()?;

    for (i, pid) in members.iter().enumerate() {
        let successor = members[(i + 1) % members.len()];
        runtime.send(*pid, SETUP, &Value::Pid(successor))?;
    }

    let port = runtime.open_port();
    let hops = ring_size * rounds;
    {
        let span = span_operation("token_ring");
        runtime.send(
            members[0],
            TOKEN,
            &Value::tuple(vec![Value::Int(hops as i64), Value::Pid(port.pid())]),
        )?;

        if runtime.config().workers == 0 {
            runtime.run_until_idle(usize::MAX);
        }
        let done = port
            .recv_timeout(RING_TIMEOUT)
            .ok_or_else(|| anyhow!("token did not complete {hops} hops in time"))?;

        span.record_items_processed(hops as u64);
        info!(
            hops,
            elapsed_ms = span.elapsed().as_millis() as u64,
            from = ?done.from,
            "Token ring complete"
        );
    }

    for pid in &members {
        runtime.request_exit(*pid, ExitReason::shutdown("demo complete"))?;
    }
    if runtime.config().workers == 0 {
        runtime.run_until_idle(usize::MAX);
    } else if let Some(last) = members.last() {
        runtime.wait_exit(*last, RING_TIMEOUT);
    }

    let stats = runtime.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    runtime.shutdown();
    Ok(())
}
