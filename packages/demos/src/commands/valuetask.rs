//! `valuetask` command: futures that are ready on first poll versus ones
//! that have to wait

use crate::cli::ValueTaskArgs;
use crate::console::{self, Stopwatch};
use crate::settings::ValueTaskConfig;
use conduit_async::{CancellationToken, TaskError, TaskResult};
use conduit_common::{LoggingTransformer, Result};
use futures::future::{self, BoxFuture, Either, FutureExt, Ready};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Value every lookup resolves to
pub const CACHED_VALUE: u64 = 123;

/// A lookup that is either already resolved or still in flight
pub type Lookup = Either<Ready<u64>, BoxFuture<'static, u64>>;

/// Resolve immediately on a cache hit, otherwise after `delay`
#[must_use]
pub fn maybe_cached(hit: bool, delay: Duration) -> Lookup {
    if hit {
        Either::Left(future::ready(CACHED_VALUE))
    } else {
        Either::Right(
            async move {
                tokio::time::sleep(delay).await;
                CACHED_VALUE
            }
            .boxed(),
        )
    }
}

/// Outcome of [`run_valuetask`]
#[derive(Clone, Debug, Serialize)]
pub struct ValueTaskReport {
    /// Settings the run used
    pub config: ValueTaskConfig,
    /// Lookups that completed on their first poll
    pub ready: u64,
    /// Lookups that had to be awaited
    pub pending: u64,
    /// Wall time of the whole run in milliseconds
    pub elapsed_ms: u64,
}

/// Perform `iterations` lookups, polling each once before awaiting it
///
/// Lookups that miss take `delay`; a zero delay may still resolve on the
/// first poll.
///
/// # Errors
///
/// Returns `TaskError::Cancelled` if `cancel` fires before the run ends.
pub async fn run_valuetask(
    config: &ValueTaskConfig,
    cancel: &CancellationToken,
) -> TaskResult<ValueTaskReport> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let started = Instant::now();
    let (mut ready, mut pending) = (0, 0);

    for _ in 0..config.iterations {
        if cancel.is_cancelled() {
            return Err(TaskError::Cancelled);
        }

        let hit = rng.random_range(0..100u8) < config.hit_rate;
        let mut lookup = maybe_cached(hit, config.delay());
        if futures::poll!(&mut lookup).is_ready() {
            ready += 1;
            continue;
        }

        pending += 1;
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TaskError::Cancelled),
            _ = lookup => {}
        }
    }

    Ok(ValueTaskReport {
        config: config.clone(),
        ready,
        pending,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}

/// Run the `valuetask` demo and show the ready/pending split
///
/// Returns `false` if the run was cancelled.
///
/// # Errors
///
/// Returns a validation error for a hit rate above 100, or an error if JSON
/// output cannot be written.
pub async fn handle_valuetask(
    args: ValueTaskArgs,
    use_json: bool,
    cancel: &CancellationToken,
) -> Result<bool> {
    let config = ValueTaskConfig::from(args);
    config.validate()?;
    LoggingTransformer::log_run_started(
        "valuetask",
        &[
            ("iterations", config.iterations.to_string()),
            ("delay_ms", config.delay_ms.to_string()),
            ("hit_rate", config.hit_rate.to_string()),
            ("seed", config.seed.to_string()),
        ],
    );

    if !use_json {
        console::header("valuetask");
        console::kv("Iterations", config.iterations);
        console::kv("DelayMs", config.delay_ms);
        console::kv("HitRatePercent", config.hit_rate);
        console::kv("Seed", config.seed);
    }

    let outcome = {
        let _timer = (!use_json).then(|| Stopwatch::start("Elapsed"));
        run_valuetask(&config, cancel).await
    };

    match outcome {
        Ok(report) => {
            if use_json {
                console::json(&report)?;
            } else {
                console::breakdown(&[
                    ("Completed on first poll", report.ready),
                    ("Needed awaiting", report.pending),
                ]);
                console::success("Done.");
            }
            Ok(true)
        }
        Err(TaskError::Cancelled) => {
            LoggingTransformer::log_cancellation("valuetask");
            if !use_json {
                console::warn("Cancelled.");
            }
            Ok(false)
        }
        Err(error) => Err(error.into_fault()),
    }
}
