//! Error types for the SplitGrid state tables.

use splitgrid_core::ExecutorId;
use thiserror::Error;

/// Result type alias for state table operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur when mutating the state tables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("executor already registered: {0}")]
    DuplicateExecutor(ExecutorId),

    #[error("executor not registered: {0}")]
    UnknownExecutor(ExecutorId),

    #[error("no outstanding execution on {0}")]
    NoOutstandingWork(ExecutorId),

    #[error("executor ids exhausted")]
    IdsExhausted,
}
