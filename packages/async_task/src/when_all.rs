//! Run a fixed set of cancellable tasks concurrently and collect every outcome

use crate::task::{AsyncTask, TaskError};
use conduit_common::Error;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a single task ended
#[derive(Debug, Clone)]
pub enum TaskOutcome<T> {
    /// Finished with a value
    Completed(T),
    /// Failed with its own fault
    Faulted(Error),
    /// Stopped by the shared cancellation signal
    Cancelled,
}

impl<T> TaskOutcome<T> {
    fn from_result(result: Result<T, TaskError>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(TaskError::Cancelled) => Self::Cancelled,
            Err(error) => Self::Faulted(error.into_fault()),
        }
    }

    /// Short status label: `completed`, `faulted` or `cancelled`
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Faulted(_) => "faulted",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Every task's outcome, in the order the tasks were given
#[derive(Debug, Clone)]
pub struct WhenAllReport<T> {
    /// Outcome per task, same order as the input
    pub outcomes: Vec<TaskOutcome<T>>,
}

/// Counts and fault messages of a [`WhenAllReport`]
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct WhenAllSummary {
    /// Tasks that finished with a value
    pub completed: usize,
    /// Tasks that failed
    pub faulted: usize,
    /// Tasks stopped by cancellation
    pub cancelled: usize,
    /// Fault messages, in task order
    pub faults: Vec<String>,
}

impl<T> WhenAllReport<T> {
    /// Faults of the tasks that failed, in task order
    #[must_use]
    pub fn faults(&self) -> Vec<Error> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                TaskOutcome::Faulted(error) => Some(error.clone()),
                _ => None,
            })
            .collect()
    }

    /// Aggregate counts
    #[must_use]
    pub fn summary(&self) -> WhenAllSummary {
        let mut summary = WhenAllSummary::default();
        for outcome in &self.outcomes {
            match outcome {
                TaskOutcome::Completed(_) => summary.completed += 1,
                TaskOutcome::Faulted(error) => {
                    summary.faulted += 1;
                    summary.faults.push(error.to_string());
                }
                TaskOutcome::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }

    /// Values of all tasks if every one completed
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Aggregate` with every fault if any task faulted,
    /// otherwise `TaskError::Cancelled` if any task was cancelled.
    pub fn into_result(self) -> Result<Vec<T>, TaskError> {
        let faults = self.faults();
        if !faults.is_empty() {
            return Err(TaskError::Aggregate(faults));
        }

        self.outcomes
            .into_iter()
            .map(|outcome| match outcome {
                TaskOutcome::Completed(value) => Ok(value),
                TaskOutcome::Faulted(error) => Err(TaskError::ExecutionFailed(error)),
                TaskOutcome::Cancelled => Err(TaskError::Cancelled),
            })
            .collect()
    }
}

/// Run `tasks` concurrently until all finish or `cancel` fires
///
/// A fault in one task does not stop the others. Cancellation stops every
/// task still running; those report [`TaskOutcome::Cancelled`].
pub async fn when_all<T>(tasks: &[AsyncTask<T>], cancel: &CancellationToken) -> WhenAllReport<T>
where
    T: Send + 'static,
{
    let futures = tasks
        .iter()
        .map(|task| task.execute_with_cancellation(cancel));
    let outcomes: Vec<TaskOutcome<T>> = futures::future::join_all(futures)
        .await
        .into_iter()
        .map(TaskOutcome::from_result)
        .collect();

    let report = WhenAllReport { outcomes };
    let summary = report.summary();
    debug!(
        completed = summary.completed,
        faulted = summary.faulted,
        cancelled = summary.cancelled,
        "when_all finished"
    );
    report
}
