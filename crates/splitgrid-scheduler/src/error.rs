//! Scheduler error types.

use splitgrid_core::ExecutorId;
use thiserror::Error;

/// Errors that can cross the scheduling boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// No executor is registered, so no placement is possible.
    #[error("no executors registered")]
    NoExecutors,

    #[error("executor not registered: {0}")]
    UnknownExecutor(ExecutorId),

    /// A completion arrived for an executor with no dispatched task left.
    #[error("completion on {0} has no matching dispatch")]
    UnmatchedCompletion(ExecutorId),

    #[error("state error: {0}")]
    State(#[from] splitgrid_state::StateError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
