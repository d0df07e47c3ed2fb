//! `list` command: shows the demos you can run

use crate::console;
use conduit_common::Result;
use serde_json::json;

const DEMOS: &[(&str, &str)] = &[
    ("list", "This list"),
    (
        "await-basics",
        "Where a task suspends and which worker thread resumes it",
    ),
    (
        "channel",
        "Bounded queue producer/consumer, backpressure, fault propagation, cancellation",
    ),
    (
        "when-all",
        "Concurrent tasks, aggregation of faults, cancellation propagation",
    ),
    (
        "valuetask",
        "Futures ready on first poll versus ones that had to wait",
    ),
];

/// Print the available demos
///
/// # Errors
///
/// Returns an error if JSON output cannot be written.
pub fn handle_list(use_json: bool) -> Result<bool> {
    if use_json {
        let demos: Vec<_> = DEMOS
            .iter()
            .map(|(command, description)| {
                json!({ "command": command, "description": description })
            })
            .collect();
        console::json(&demos)?;
        return Ok(true);
    }

    let rows: Vec<Vec<String>> = DEMOS
        .iter()
        .map(|(command, description)| vec![(*command).to_string(), (*description).to_string()])
        .collect();
    console::table(&["Command", "What it shows"], &rows);
    println!();
    println!("Try: conduit channel --capacity 2 --items 10");
    Ok(true)
}
