//! `when-all` command: concurrent tasks, fault aggregation, cancellation

use crate::cli::WhenAllArgs;
use crate::console::{self, Stopwatch};
use crate::settings::WhenAllConfig;
use conduit_async::{
    when_all, AsyncTask, CancellationToken, TaskError, TaskOutcome, WhenAllReport,
};
use conduit_common::{Error, LoggingTransformer, Result};
use serde_json::json;

/// Build the demo tasks: task `i` waits, fails if it is `fail_on`, waits again
#[must_use]
pub fn demo_tasks(config: &WhenAllConfig) -> Vec<AsyncTask<u64>> {
    (1..=config.iterations)
        .map(|id| {
            let delay = config.delay();
            let fail_on = config.fail_on;
            AsyncTask::new(move || async move {
                tokio::time::sleep(delay).await;
                if fail_on == Some(id) {
                    return Err(TaskError::ExecutionFailed(Error::other(format!(
                        "Boom from task {id}"
                    ))));
                }
                tokio::time::sleep(delay).await;
                Ok(id)
            })
        })
        .collect()
}

/// Run the demo tasks under a child of `cancel`, honoring `cancel_after`
pub async fn run_when_all(
    config: &WhenAllConfig,
    cancel: &CancellationToken,
) -> WhenAllReport<u64> {
    let token = cancel.child_token();
    let scheduled = config.cancel_after().map(|after| {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            token.cancel();
        })
    });

    let report = when_all(&demo_tasks(config), &token).await;
    if let Some(handle) = scheduled {
        handle.abort();
    }
    report
}

/// Run the `when-all` demo and print every task's outcome
///
/// Returns `true` only if every task completed.
///
/// # Errors
///
/// Returns an error if JSON output cannot be written.
pub async fn handle_when_all(
    args: WhenAllArgs,
    use_json: bool,
    cancel: &CancellationToken,
) -> Result<bool> {
    let config = WhenAllConfig::from(args);
    LoggingTransformer::log_run_started(
        "when-all",
        &[
            ("iterations", config.iterations.to_string()),
            ("delay_ms", config.delay_ms.to_string()),
            ("fail_on", format!("{:?}", config.fail_on)),
            ("cancel_after_ms", format!("{:?}", config.cancel_after_ms)),
        ],
    );

    if !use_json {
        console::header("when-all");
        console::kv("Iterations", config.iterations);
        console::kv("DelayMs", config.delay_ms);
        console::kv("FailOn", config.fail_on.unwrap_or(0));
        console::kv("CancelAfterMs", config.cancel_after_ms.unwrap_or(0));
        if config.cancel_after_ms.is_some() {
            console::warn("Cancellation scheduled.");
        }
    }

    let report = {
        let _timer = (!use_json).then(|| Stopwatch::start("when_all"));
        run_when_all(&config, cancel).await
    };
    let summary = report.summary();

    for fault in report.faults() {
        LoggingTransformer::log_fault("task", &fault);
    }

    if use_json {
        let tasks: Vec<_> = report
            .outcomes
            .iter()
            .enumerate()
            .map(|(i, outcome)| {
                json!({
                    "task": i + 1,
                    "status": outcome.label(),
                    "error": fault_text(outcome),
                })
            })
            .collect();
        console::json(&json!({ "config": config, "summary": summary, "tasks": tasks }))?;
    } else {
        let rows: Vec<Vec<String>> = report
            .outcomes
            .iter()
            .enumerate()
            .map(|(i, outcome)| {
                vec![
                    (i + 1).to_string(),
                    outcome.label().to_string(),
                    fault_text(outcome),
                ]
            })
            .collect();
        console::table(&["Task", "Status", "Fault"], &rows);
    }

    let success = match report.into_result() {
        Ok(_) => {
            if !use_json {
                console::success("All tasks completed successfully.");
            }
            true
        }
        Err(TaskError::Cancelled) => {
            LoggingTransformer::log_cancellation("when-all");
            if !use_json {
                console::warn("Tasks were cancelled.");
            }
            false
        }
        Err(error) => {
            if !use_json {
                console::error(&format!("Caught: {error}"));
                for fault in &summary.faults {
                    console::error(&format!("- {fault}"));
                }
            }
            false
        }
    };
    Ok(success)
}

fn fault_text<T>(outcome: &TaskOutcome<T>) -> String {
    match outcome {
        TaskOutcome::Faulted(error) => error.to_string(),
        TaskOutcome::Completed(_) | TaskOutcome::Cancelled => String::new(),
    }
}
