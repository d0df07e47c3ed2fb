//! `await-basics` command: where a task suspends and which thread resumes it

use crate::cli::AwaitBasicsArgs;
use crate::console;
use conduit_async::{CancellationToken, TaskError, TaskResult};
use conduit_common::{LoggingTransformer, Result};
use log::debug;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// Threads seen on either side of one suspension point
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct StepTrace {
    /// 1-based step number
    pub step: u64,
    /// Thread that ran the code before the await
    pub before: String,
    /// Thread that resumed the task after the await
    pub after: String,
}

impl StepTrace {
    /// Whether the task resumed on a different thread
    #[must_use]
    pub fn hopped(&self) -> bool {
        self.before != self.after
    }
}

fn current_thread() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => format!("{name} {:?}", thread.id()),
        None => format!("{:?}", thread.id()),
    }
}

/// Sleep `delay` at each of `iterations` steps, recording the thread before
/// and after every await
///
/// `on_step` sees each trace as soon as its step resumes.
///
/// # Errors
///
/// Returns `TaskError::Cancelled` if `cancel` fires during a step.
pub async fn run_await_basics<F>(
    iterations: u64,
    delay: Duration,
    cancel: &CancellationToken,
    mut on_step: F,
) -> TaskResult<Vec<StepTrace>>
where
    F: FnMut(&StepTrace),
{
    let mut traces = Vec::new();
    for step in 1..=iterations {
        let before = current_thread();
        debug!("step {step}: suspending on {before}");
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TaskError::Cancelled),
            () = tokio::time::sleep(delay) => {}
        }
        let trace = StepTrace {
            step,
            before,
            after: current_thread(),
        };
        on_step(&trace);
        traces.push(trace);
    }
    Ok(traces)
}

/// Run the `await-basics` demo
///
/// Returns `false` if the run was cancelled.
///
/// # Errors
///
/// Returns an error if JSON output cannot be written.
pub async fn handle_await_basics(
    args: AwaitBasicsArgs,
    use_json: bool,
    cancel: &CancellationToken,
) -> Result<bool> {
    LoggingTransformer::log_run_started(
        "await-basics",
        &[
            ("iterations", args.iterations.to_string()),
            ("delay_ms", args.delay_ms.to_string()),
        ],
    );

    let runtime = tokio::runtime::Handle::current();
    if !use_json {
        console::header("await-basics");
        console::kv("Process", std::process::id());
        console::kv("Runtime", format!("{:?}", runtime.runtime_flavor()));
        console::kv("Workers", runtime.metrics().num_workers());
        console::kv("Thread", current_thread());
        console::kv("Iterations", args.iterations);
        console::kv("DelayMs", args.delay_ms);
    }

    let delay = Duration::from_millis(args.delay_ms);
    let outcome = run_await_basics(args.iterations, delay, cancel, |trace| {
        if !use_json {
            println!();
            println!("Step {}: before await (thread {})", trace.step, trace.before);
            println!("Step {}: after await  (thread {})", trace.step, trace.after);
        }
    })
    .await;

    match outcome {
        Ok(steps) => {
            let hops = steps.iter().filter(|trace| trace.hopped()).count();
            if use_json {
                console::json(&json!({
                    "iterations": args.iterations,
                    "delay_ms": args.delay_ms,
                    "hops": hops,
                    "steps": steps,
                }))?;
            } else {
                console::kv("Resumed on another thread", hops);
                console::success("Done.");
            }
            Ok(true)
        }
        Err(TaskError::Cancelled) => {
            LoggingTransformer::log_cancellation("await-basics");
            if !use_json {
                console::warn("Cancelled.");
            }
            Ok(false)
        }
        Err(error) => Err(error.into_fault()),
    }
}
