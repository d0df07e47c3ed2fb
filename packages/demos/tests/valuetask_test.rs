//! Tests for the `valuetask` demo

use clap::Parser;
use conduit_async::{CancellationToken, TaskError};
use conduit_demos::commands::valuetask::{
    handle_valuetask, maybe_cached, run_valuetask, CACHED_VALUE,
};
use conduit_demos::settings::ValueTaskConfig;
use conduit_demos::{Cli, Commands};
use futures::FutureExt;
use std::time::Duration;

fn config(iterations: u64, hit_rate: u8, seed: u64) -> ValueTaskConfig {
    ValueTaskConfig {
        iterations,
        delay_ms: 50,
        hit_rate,
        seed,
    }
}

#[tokio::test(start_paused = true)]
async fn hits_are_ready_misses_are_pending() {
    assert_eq!(
        maybe_cached(true, Duration::from_millis(50)).now_or_never(),
        Some(CACHED_VALUE)
    );

    let mut miss = maybe_cached(false, Duration::from_millis(50));
    assert!(futures::poll!(&mut miss).is_pending());
    assert_eq!(miss.await, CACHED_VALUE);
}

#[tokio::test(start_paused = true)]
async fn counts_add_up_to_iterations() {
    let report = run_valuetask(&config(20, 50, 7), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.ready + report.pending, 20);
}

#[tokio::test(start_paused = true)]
async fn extreme_hit_rates() {
    let cancel = CancellationToken::new();

    let all_hits = run_valuetask(&config(10, 100, 1), &cancel).await.unwrap();
    assert_eq!((all_hits.ready, all_hits.pending), (10, 0));
    assert_eq!(all_hits.elapsed_ms, 0);

    let all_misses = run_valuetask(&config(10, 0, 1), &cancel).await.unwrap();
    assert_eq!((all_misses.ready, all_misses.pending), (0, 10));
    assert_eq!(all_misses.elapsed_ms, 500);
}

#[tokio::test(start_paused = true)]
async fn same_seed_same_split() {
    let cancel = CancellationToken::new();
    let first = run_valuetask(&config(50, 80, 42), &cancel).await.unwrap();
    let second = run_valuetask(&config(50, 80, 42), &cancel).await.unwrap();
    assert_eq!(
        (first.ready, first.pending),
        (second.ready, second.pending)
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_a_pending_lookup() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        trigger.cancel();
    });

    let result = run_valuetask(&config(10, 0, 3), &cancel).await;
    assert!(matches!(result, Err(TaskError::Cancelled)));
}

#[test]
fn defaults_and_validation() {
    let cli = Cli::try_parse_from(["conduit", "valuetask"]).unwrap();
    let Commands::ValueTask(args) = cli.command else {
        panic!("expected valuetask command");
    };
    assert_eq!(ValueTaskConfig::from(args), ValueTaskConfig::default());

    let parsed: ValueTaskConfig = serde_json::from_str(r#"{ "seed": 9 }"#).unwrap();
    assert_eq!(parsed.hit_rate, 80);
    assert_eq!(parsed.seed, 9);

    assert!(Cli::try_parse_from(["conduit", "valuetask", "--hit-rate", "101"]).is_err());
    assert!(config(1, 150, 0).validate().is_err());
    assert!(config(1, 100, 0).validate().is_ok());
}

#[tokio::test(start_paused = true)]
async fn handler_reports_success() {
    let cli = Cli::try_parse_from([
        "conduit",
        "valuetask",
        "--iterations",
        "4",
        "--hit-rate",
        "50",
        "--delay-ms",
        "10",
    ])
    .unwrap();
    let Commands::ValueTask(args) = cli.command else {
        panic!("expected valuetask command");
    };
    let ok = handle_valuetask(args, false, &CancellationToken::new())
        .await
        .unwrap();
    assert!(ok);
}
