//! Four-mode command execution
//!
//! Every command runs through here. Two flags select the mode:
//!
//! | watch | json  | behavior                                         |
//! |-------|-------|--------------------------------------------------|
//! | false | false | run once, render for humans, exit 0/1            |
//! | false | true  | run once, print one JSON document, exit 0/1      |
//! | true  | false | tick forever, render each tick with inline deltas |
//! | true  | true  | tick forever, one JSON document per tick          |
//!
//! A watch session ticks immediately on entry, then sleeps `interval`
//! between ticks. Failed ticks are reported and the session continues; only
//! successful ticks update the value that deltas are computed against.
//! Cancellation arrives on a watch channel and is honored during the
//! inter-tick sleep or right after a tick, never mid-fetch.

use serde_json::json;
use std::io::Write;
use std::time::Duration;
use tokio::sync::watch;

use crate::context::{AppContext, Config};
use crate::diff::Diff;
use crate::envelope::Envelope;
use crate::operation::Operation;

/// Execution mode, a pure function of the two flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    OnceHuman,
    OnceJson,
    WatchHuman,
    WatchJson,
}

impl Mode {
    pub fn select(watch: bool, json: bool) -> Self {
        match (watch, json) {
            (false, false) => Mode::OnceHuman,
            (false, true) => Mode::OnceJson,
            (true, false) => Mode::WatchHuman,
            (true, true) => Mode::WatchJson,
        }
    }
}

/// Per-invocation execution options
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub watch: bool,
    pub json: bool,
    /// Sleep between watch ticks; unused in one-shot modes
    pub interval: Duration,
    /// Abort a watch session after this many consecutive failed ticks
    pub max_consecutive_failures: Option<u32>,
}

impl RunOptions {
    pub fn from_config(config: &Config, watch: bool, json: bool) -> Self {
        Self {
            watch,
            json,
            interval: config.watch_interval,
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

/// Transient state owned by one running watch loop
struct WatchState<T> {
    /// Value of the last successful tick; failed ticks never overwrite it
    previous: Option<T>,
    ticks: u64,
}

/// Runs an operation in the selected mode against process stdout/stderr,
/// returning the process exit code
///
/// Exit code 0 means a successful one-shot or a watch session ended by
/// cancellation; 1 means a one-shot failure or a watch session aborted by
/// the consecutive-failure limit.
pub async fn run<O: Operation>(
    ctx: &AppContext,
    op: &O,
    opts: &RunOptions,
    shutdown: watch::Receiver<bool>,
) -> i32 {
    run_with_io(
        ctx,
        op,
        opts,
        shutdown,
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )
    .await
}

/// [`run`] with explicit output streams
pub async fn run_with_io<O, OutW, ErrW>(
    ctx: &AppContext,
    op: &O,
    opts: &RunOptions,
    shutdown: watch::Receiver<bool>,
    out: &mut OutW,
    err: &mut ErrW,
) -> i32
where
    O: Operation,
    OutW: Write + Send,
    ErrW: Write + Send,
{
    match Mode::select(opts.watch, opts.json) {
        Mode::OnceHuman => {
            let envelope = Envelope::capture(op.fetch(ctx)).await;
            match envelope.data() {
                Some(data) => {
                    let _ = writeln!(out, "{}", op.render(data, None));
                    0
                }
                None => {
                    let _ = writeln!(err, "{}: {}", op.name(), error_message(&envelope));
                    1
                }
            }
        }
        Mode::OnceJson => {
            let envelope = Envelope::capture(op.fetch(ctx)).await;
            let doc = envelope_document(op, &envelope);
            if envelope.is_success() {
                write_pretty(out, &doc);
                0
            } else {
                write_pretty(err, &doc);
                1
            }
        }
        Mode::WatchHuman => run_watch(ctx, op, opts, shutdown, false, out, err).await,
        Mode::WatchJson => run_watch(ctx, op, opts, shutdown, true, out, err).await,
    }
}

async fn run_watch<O, OutW, ErrW>(
    ctx: &AppContext,
    op: &O,
    opts: &RunOptions,
    mut shutdown: watch::Receiver<bool>,
    json_mode: bool,
    out: &mut OutW,
    err: &mut ErrW,
) -> i32
where
    O: Operation,
    OutW: Write + Send,
    ErrW: Write + Send,
{
    tracing::info!(
        op = op.name(),
        interval_secs = opts.interval.as_secs_f64(),
        "starting watch session"
    );

    let mut state = WatchState::<O::Output> {
        previous: None,
        ticks: 0,
    };
    let mut consecutive_failures: u32 = 0;

    loop {
        state.ticks += 1;
        let envelope = Envelope::capture(op.fetch(ctx)).await;

        if json_mode {
            let doc = tick_document(op, &envelope, state.ticks, state.previous.as_ref());
            if let Ok(line) = serde_json::to_string(&doc) {
                let _ = writeln!(out, "{line}");
            }
        } else {
            emit_human_tick(op, &envelope, state.ticks, state.previous.as_ref(), out);
        }

        if envelope.is_success() {
            consecutive_failures = 0;
            if let Some(data) = envelope.into_data() {
                state.previous = Some(data);
            }
        } else {
            consecutive_failures += 1;
            tracing::warn!(
                op = op.name(),
                tick = state.ticks,
                consecutive_failures,
                "watch tick failed"
            );
            if let Some(limit) = opts.max_consecutive_failures {
                if consecutive_failures >= limit {
                    let _ = writeln!(
                        err,
                        "{}: aborting watch after {} consecutive failed ticks",
                        op.name(),
                        consecutive_failures
                    );
                    return 1;
                }
            }
        }

        // a signal that landed mid-tick is honored here, before sleeping
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(opts.interval) => {}
            _ = cancelled(&mut shutdown) => break,
        }
    }

    tracing::info!(op = op.name(), ticks = state.ticks, "watch session cancelled");
    0
}

/// Resolves once a cancellation signal arrives
///
/// If the sender is dropped without ever signalling, cancellation can no
/// longer arrive; the future parks so the sleep branch always wins.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn error_message<T>(envelope: &Envelope<T>) -> String {
    envelope
        .error()
        .map(|info| info.message.clone())
        .unwrap_or_else(|| "unknown error".to_string())
}

/// One JSON document for a one-shot result: the envelope with the
/// operation's own JSON view substituted for the raw data
fn envelope_document<O: Operation>(op: &O, envelope: &Envelope<O::Output>) -> serde_json::Value {
    let mut doc = serde_json::to_value(envelope).unwrap_or_else(|_| {
        json!({
            "success": false,
            "error": { "kind": "internal", "message": "result serialization failed" },
        })
    });
    if let serde_json::Value::Object(map) = &mut doc {
        map.insert("op".to_string(), json!(op.name()));
        if let Some(data) = envelope.data() {
            map.insert("data".to_string(), op.json(data));
        }
    }
    doc
}

/// One self-contained JSON document per watch tick: envelope, tick number
/// and the delta against the previous successful tick (`{}` when none)
fn tick_document<O: Operation>(
    op: &O,
    envelope: &Envelope<O::Output>,
    tick: u64,
    previous: Option<&O::Output>,
) -> serde_json::Value {
    let mut doc = envelope_document(op, envelope);
    if let serde_json::Value::Object(map) = &mut doc {
        map.insert("tick".to_string(), json!(tick));
        let delta = match (envelope.data(), previous) {
            (Some(current), Some(prev)) => {
                serde_json::to_value(current.diff(prev)).unwrap_or_else(|_| json!({}))
            }
            _ => json!({}),
        };
        map.insert("delta".to_string(), delta);
    }
    doc
}

fn emit_human_tick<O: Operation, W: Write>(
    op: &O,
    envelope: &Envelope<O::Output>,
    tick: u64,
    previous: Option<&O::Output>,
    out: &mut W,
) {
    let stamp = envelope.timestamp().format("%H:%M:%S");
    let _ = writeln!(out, "--- {} tick {} ---", stamp, tick);
    match envelope.data() {
        Some(data) => {
            let _ = writeln!(out, "{}", op.render(data, previous));
        }
        None => {
            let _ = writeln!(out, "fetch failed: {}", error_message(envelope));
        }
    }
    let _ = writeln!(out);
}

fn write_pretty<W: Write>(sink: &mut W, doc: &serde_json::Value) {
    if let Ok(rendered) = serde_json::to_string_pretty(doc) {
        let _ = writeln!(sink, "{rendered}");
    }
}
