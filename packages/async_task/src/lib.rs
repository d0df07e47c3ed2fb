//! # Async work coordination
//!
//! A bounded FIFO work queue connecting a producer and a consumer, with
//! backpressure, cooperative cancellation, and fault propagation on close.
//! Also carries the drivers that run the two sides and a small
//! `when_all` helper for joining a fixed set of cancellable tasks.

pub mod pipeline;
pub mod queue;
pub mod task;
pub mod when_all;

pub use pipeline::{
    consume, produce, produce_with, run_pipeline, CloseGuard, PipelineConfig, PipelineReport,
    SideStatus,
};
pub use queue::{BoundedWorkQueue, QueueError, DEFAULT_CAPACITY};
pub use task::{AsyncTask, TaskError, TaskResult};
pub use when_all::{when_all, TaskOutcome, WhenAllReport, WhenAllSummary};

/// Cancellation signal shared by producers, consumers and tasks
pub use tokio_util::sync::CancellationToken;
