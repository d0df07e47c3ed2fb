//! Producer and consumer drivers for [`BoundedWorkQueue`]
//!
//! The producer always closes the queue on its way out: cleanly after the
//! last item, with the fault when its work function fails, and through
//! [`CloseGuard`] when it is dropped or unwinds without closing.

use crate::queue::{BoundedWorkQueue, QueueError, DEFAULT_CAPACITY};
use crate::task::{TaskError, TaskResult};
use conduit_common::{err, Error, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Closes a queue on drop unless it was closed explicitly
///
/// Held by the producer so the consumer never waits on a queue nobody will
/// close. A drop without an explicit [`close`](CloseGuard::close) counts as
/// an abnormal exit and closes with a fault.
pub struct CloseGuard<T> {
    queue: BoundedWorkQueue<T>,
    armed: bool,
}

impl<T> CloseGuard<T> {
    /// Guard `queue` until [`close`](Self::close) is called
    #[must_use]
    pub fn new(queue: BoundedWorkQueue<T>) -> Self {
        Self { queue, armed: true }
    }

    /// Close the queue now and disarm the guard
    pub fn close(mut self, fault: Option<Error>) -> bool {
        self.armed = false;
        self.queue.close(fault)
    }
}

impl<T> Drop for CloseGuard<T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let reason = if std::thread::panicking() {
            "producer panicked before closing the queue"
        } else {
            "producer exited without closing the queue"
        };
        if self.queue.close(Some(Error::internal().context(reason))) {
            warn!("{reason}");
        }
    }
}

/// Sleep for `delay` unless `cancel` fires first
async fn pause(delay: Duration, cancel: &CancellationToken) -> std::result::Result<(), QueueError> {
    if delay.is_zero() {
        return if cancel.is_cancelled() {
            Err(QueueError::Cancelled)
        } else {
            Ok(())
        };
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(QueueError::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Generate `count` items with `work(1..=count)` and enqueue them in order
///
/// Sleeps `delay` before each item. Closes the queue before returning on
/// every path; a failing `work` closes it with that fault so the consumer
/// sees it after draining. Returns the number of items enqueued.
///
/// # Errors
///
/// Returns `TaskError::Cancelled` if `cancel` fires, `TaskError::ExecutionFailed`
/// with the fault from `work`, or `TaskError::Queue` if the queue was closed
/// by someone else.
pub async fn produce<T, F>(
    queue: BoundedWorkQueue<T>,
    count: u64,
    delay: Duration,
    cancel: &CancellationToken,
    work: F,
) -> TaskResult<u64>
where
    F: FnMut(u64) -> Result<T>,
{
    produce_with(queue, count, delay, cancel, work, |_| {}).await
}

/// [`produce`], calling `on_enqueued(index)` once each item is in the queue
///
/// Items that `work` generated but the queue never accepted are not
/// reported, so the callback sees the true count even when the producer
/// stops early.
///
/// # Errors
///
/// Same as [`produce`].
pub async fn produce_with<T, F, S>(
    queue: BoundedWorkQueue<T>,
    count: u64,
    delay: Duration,
    cancel: &CancellationToken,
    mut work: F,
    mut on_enqueued: S,
) -> TaskResult<u64>
where
    F: FnMut(u64) -> Result<T>,
    S: FnMut(u64),
{
    let guard = CloseGuard::new(queue.clone());
    let mut produced = 0;

    for index in 1..=count {
        let step = async {
            pause(delay, cancel).await?;
            let item = work(index).map_err(TaskError::from)?;
            queue.enqueue(item, cancel).await?;
            Ok::<(), TaskError>(())
        };

        if let Err(error) = step.await {
            let fault = match &error {
                TaskError::Cancelled => Error::cancelled().context("producer cancelled"),
                other => other.clone().into_fault(),
            };
            warn!(item = index, produced, error = %error, "producer stopping");
            guard.close(Some(fault));
            return Err(error);
        }

        produced += 1;
        on_enqueued(index);
        info!(item = index, "produced");
    }

    guard.close(None);
    debug!(produced, "producer finished");
    Ok(produced)
}

/// Dequeue until drained, handing each item to `sink` after `delay`
///
/// Returns the number of items consumed.
///
/// # Errors
///
/// Returns `TaskError::Cancelled` if `cancel` fires, or
/// `TaskError::Queue(QueueError::UpstreamFault)` once a faulted queue drains.
pub async fn consume<T, F>(
    queue: BoundedWorkQueue<T>,
    delay: Duration,
    cancel: &CancellationToken,
    mut sink: F,
) -> TaskResult<u64>
where
    F: FnMut(T),
{
    let mut consumed = 0;
    while let Some(item) = queue.dequeue(cancel).await? {
        pause(delay, cancel).await?;
        sink(item);
        consumed += 1;
    }
    debug!(consumed, "consumer drained queue");
    Ok(consumed)
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY.get()
}

fn default_items() -> u64 {
    20
}

fn default_producer_delay_ms() -> u64 {
    50
}

fn default_consumer_delay_ms() -> u64 {
    150
}

/// Knobs for one producer/consumer run
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Queue capacity (must be at least 1)
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Number of items the producer generates
    #[serde(default = "default_items")]
    pub items: u64,
    /// Delay before producing each item, in milliseconds
    #[serde(default = "default_producer_delay_ms")]
    pub producer_delay_ms: u64,
    /// Delay after receiving each item, in milliseconds
    #[serde(default = "default_consumer_delay_ms")]
    pub consumer_delay_ms: u64,
    /// Make the producer's work fail at this item
    #[serde(default)]
    pub fail_on: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            items: default_items(),
            producer_delay_ms: default_producer_delay_ms(),
            consumer_delay_ms: default_consumer_delay_ms(),
            fail_on: None,
        }
    }
}

impl PipelineConfig {
    /// Check the configuration before a run
    ///
    /// # Errors
    ///
    /// Returns a validation error if `capacity` is zero.
    pub fn validate(&self) -> Result<()> {
        self.queue_capacity().map(|_| ())
    }

    /// Capacity as the queue expects it
    ///
    /// # Errors
    ///
    /// Returns a validation error if `capacity` is zero.
    pub fn queue_capacity(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.capacity)
            .ok_or_else(|| err!(validation, "capacity must be at least 1"))
    }

    /// Producer delay as a [`Duration`]
    #[must_use]
    pub fn producer_delay(&self) -> Duration {
        Duration::from_millis(self.producer_delay_ms)
    }

    /// Consumer delay as a [`Duration`]
    #[must_use]
    pub fn consumer_delay(&self) -> Duration {
        Duration::from_millis(self.consumer_delay_ms)
    }
}

/// How one side of the pipeline ended
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum SideStatus {
    /// Finished normally
    Completed,
    /// Stopped by the cancellation signal
    Cancelled,
    /// Stopped by a fault (own or upstream)
    Faulted(String),
}

impl SideStatus {
    fn from_outcome(outcome: std::result::Result<TaskResult<u64>, tokio::task::JoinError>) -> Self {
        match outcome {
            Ok(Ok(_)) => Self::Completed,
            Ok(Err(error)) => {
                // An upstream fault that records cancellation is still a cancellation.
                let fault = error.into_fault();
                if fault.is_cancelled() {
                    Self::Cancelled
                } else {
                    Self::Faulted(fault.to_string())
                }
            }
            Err(join) if join.is_cancelled() => Self::Cancelled,
            Err(join) => Self::Faulted(format!("task panicked: {join}")),
        }
    }

    /// Whether this side ended normally
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Outcome of [`run_pipeline`]
#[derive(Clone, Debug, Serialize)]
pub struct PipelineReport {
    /// Settings the run used
    pub config: PipelineConfig,
    /// Items the producer placed in the queue
    pub produced: u64,
    /// Items the consumer processed, in arrival order
    pub consumed: Vec<u64>,
    /// Wall time of the whole run in milliseconds
    pub elapsed_ms: u64,
    /// How the producer ended
    pub producer: SideStatus,
    /// How the consumer ended
    pub consumer: SideStatus,
}

impl PipelineReport {
    /// Whether both sides finished normally
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.producer.is_completed() && self.consumer.is_completed()
    }
}

/// Run one producer and one consumer over a fresh queue until both finish
///
/// The producer generates `1..=items`, failing at `fail_on` if set.
///
/// # Errors
///
/// Returns a validation error if the configuration is invalid. Producer and
/// consumer failures are reported in the [`PipelineReport`], not as errors.
pub async fn run_pipeline(
    config: PipelineConfig,
    cancel: &CancellationToken,
) -> Result<PipelineReport> {
    let queue = BoundedWorkQueue::<u64>::new(config.queue_capacity()?);
    let enqueued = Arc::new(AtomicU64::new(0));
    let started = Instant::now();

    let producer = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        let enqueued = Arc::clone(&enqueued);
        let (count, delay, fail_on) = (config.items, config.producer_delay(), config.fail_on);
        tokio::spawn(async move {
            produce_with(
                queue,
                count,
                delay,
                &cancel,
                |index| {
                    if fail_on == Some(index) {
                        return Err(Error::other(format!("Boom from item {index}")));
                    }
                    Ok(index)
                },
                |_| {
                    enqueued.fetch_add(1, Ordering::Relaxed);
                },
            )
            .await
        })
    };

    let consumer = {
        let cancel = cancel.clone();
        let delay = config.consumer_delay();
        tokio::spawn(async move {
            let mut received = Vec::new();
            let result = consume(queue, delay, &cancel, |item| {
                info!(item, "consumed");
                received.push(item);
            })
            .await;
            (result, received)
        })
    };

    let (producer, consumer) = tokio::join!(producer, consumer);
    let (consumer, consumed) = match consumer {
        Ok((result, received)) => (Ok(result), received),
        Err(join) => (Err(join), Vec::new()),
    };

    let elapsed = started.elapsed();
    Ok(PipelineReport {
        config,
        produced: enqueued.load(Ordering::Relaxed),
        consumed,
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        producer: SideStatus::from_outcome(producer),
        consumer: SideStatus::from_outcome(consumer),
    })
}
