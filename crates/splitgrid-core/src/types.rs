//! Shared identifiers used across SplitGrid crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a worker-local executor process.
///
/// Ids are dense: the first executor is `0`, and each executor added to the
/// pool takes the next integer. An id is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutorId(pub u32);

impl ExecutorId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exec-{}", self.0)
    }
}

impl From<u32> for ExecutorId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Identifier of a lineage (parent task) whose sub-tasks share an executor.
pub type LineageId = u64;

/// Identifier of a single dispatched task.
pub type TaskId = u64;

/// Where a split must be resident for a task to run without a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorTarget {
    /// A specific executor.
    Executor(ExecutorId),
    /// Anywhere on this worker: some executor or the shared-memory array set.
    Worker,
}

impl From<ExecutorId> for ExecutorTarget {
    fn from(id: ExecutorId) -> Self {
        ExecutorTarget::Executor(id)
    }
}

/// A split required by a task, as carried by the task descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SplitArg {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

impl SplitArg {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}
