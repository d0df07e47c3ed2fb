//! Re-runnable async tasks with timeout and cancellation

use crate::queue::QueueError;
use conduit_common::Error;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Error types for async task operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    /// The task's own work failed
    #[error("Task execution failed: {0}")]
    ExecutionFailed(Error),
    /// The task observed cancellation before finishing
    #[error("Task was cancelled")]
    Cancelled,
    /// The task did not finish within its time limit
    #[error("Timeout error")]
    Timeout,
    /// A queue operation failed
    #[error("Queue error: {0}")]
    Queue(QueueError),
    /// One or more tasks in a group faulted
    #[error("{} task(s) faulted", .0.len())]
    Aggregate(Vec<Error>),
}

impl TaskError {
    /// Collapse this error into a shared [`Error`] suitable for fault reporting
    #[must_use]
    pub fn into_fault(self) -> Error {
        match self {
            Self::ExecutionFailed(error) => error,
            Self::Cancelled => Error::cancelled(),
            Self::Timeout => Error::timeout(),
            Self::Queue(QueueError::UpstreamFault(error)) => error,
            Self::Queue(QueueError::Cancelled) => Error::cancelled(),
            Self::Queue(other @ QueueError::QueueClosed) => {
                Error::internal().context(other.to_string())
            }
            Self::Aggregate(errors) => {
                let first = errors
                    .first()
                    .map_or_else(String::new, |e| format!(", first: {e}"));
                Error::other(format!("{} task(s) faulted{first}", errors.len()))
            }
        }
    }
}

impl From<QueueError> for TaskError {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::Cancelled => Self::Cancelled,
            other => Self::Queue(other),
        }
    }
}

impl From<Error> for TaskError {
    fn from(error: Error) -> Self {
        if error.is_cancelled() {
            Self::Cancelled
        } else {
            Self::ExecutionFailed(error)
        }
    }
}

/// Result type for async tasks
pub type TaskResult<T> = Result<T, TaskError>;

/// Boxed task body: each call produces a fresh future
pub type TaskFn<T> =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = TaskResult<T>> + Send>> + Send + Sync>;

/// Async task that can be executed (and re-executed) without blocking
pub struct AsyncTask<T> {
    inner: TaskFn<T>,
}

impl<T> AsyncTask<T>
where
    T: Send + 'static,
{
    /// Create a new async task from a closure that returns a future
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult<T>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move || Box::pin(f())),
        }
    }

    /// Execute the task
    ///
    /// # Errors
    ///
    /// Returns whatever error the task body produces.
    pub async fn execute(&self) -> TaskResult<T> {
        (self.inner)().await
    }

    /// Execute with a time limit
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Timeout` if the task exceeds `duration`,
    /// or any error returned by the task body.
    pub async fn execute_with_timeout(&self, duration: std::time::Duration) -> TaskResult<T> {
        match tokio::time::timeout(duration, self.execute()).await {
            Ok(result) => result,
            Err(_) => Err(TaskError::Timeout),
        }
    }

    /// Execute until the task finishes or `cancel` fires
    ///
    /// The task body is dropped at its current await point on cancellation.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Cancelled` if `cancel` fires first,
    /// or any error returned by the task body.
    pub async fn execute_with_cancellation(&self, cancel: &CancellationToken) -> TaskResult<T> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(TaskError::Cancelled),
            result = self.execute() => result,
        }
    }
}

impl<T> Clone for AsyncTask<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
