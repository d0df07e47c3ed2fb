//! `channel` command: one producer and one consumer over a bounded queue

use crate::cli::ChannelArgs;
use crate::console;
use conduit_async::{run_pipeline, CancellationToken, SideStatus};
use conduit_common::{LoggingTransformer, Result};
use std::time::Duration;

/// Run the producer/consumer demo and report how each side ended
///
/// Returns `true` only if both sides completed.
///
/// # Errors
///
/// Returns a validation error for bad settings, or an error if JSON output
/// cannot be written.
pub async fn handle_channel(
    args: ChannelArgs,
    use_json: bool,
    cancel: &CancellationToken,
) -> Result<bool> {
    let config = args.into_config()?;
    LoggingTransformer::log_run_started(
        "channel",
        &[
            ("capacity", config.capacity.to_string()),
            ("items", config.items.to_string()),
            ("producer_delay_ms", config.producer_delay_ms.to_string()),
            ("consumer_delay_ms", config.consumer_delay_ms.to_string()),
        ],
    );

    if !use_json {
        console::header("channel");
        console::kv("Capacity", config.capacity);
        console::kv("Items", config.items);
        console::kv("ProducerDelayMs", config.producer_delay_ms);
        console::kv("ConsumerDelayMs", config.consumer_delay_ms);
        if let Some(item) = config.fail_on {
            console::kv("FailOn", item);
        }
    }

    let report = run_pipeline(config, cancel).await?;
    let success = report.is_success();
    LoggingTransformer::log_performance_metric(
        "channel demo",
        Duration::from_millis(report.elapsed_ms),
        success,
    );

    if use_json {
        console::json(&report)?;
        return Ok(success);
    }

    console::kv("Produced", report.produced);
    console::kv("Consumed", report.consumed.len());
    console::kv("Channel demo", format!("{} ms", report.elapsed_ms));
    narrate_side("Producer", &report.producer);
    narrate_side("Consumer", &report.consumer);
    if success {
        console::success("Done.");
    }
    Ok(success)
}

fn narrate_side(side: &str, status: &SideStatus) {
    match status {
        SideStatus::Completed => {}
        SideStatus::Cancelled => {
            LoggingTransformer::log_cancellation(side);
            console::warn(&format!("{side} cancelled."));
        }
        SideStatus::Faulted(fault) => console::error(&format!("{side} faulted: {fault}")),
    }
}
