//! Partition validation — can a task run at a target without a transfer?

use serde::{Deserialize, Serialize};

use splitgrid_core::{ExecutorTarget, SplitArg};
use splitgrid_state::Metadata;

/// Residency of a task's splits relative to a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Validation {
    /// Every split is resident at the target.
    AllAvailable,
    /// Every split exists on this worker, but `missing` are not at the target.
    FetchRequired { missing: Vec<String> },
    /// `missing` exist nowhere on this worker.
    Unavailable { missing: Vec<String> },
}

impl Validation {
    pub fn is_all_available(&self) -> bool {
        matches!(self, Validation::AllAvailable)
    }
}

/// Classify `splits` against `target`.
///
/// `in_shared_arrays` reports whether a split is durably present at worker
/// level (the shared-memory array set). Unavailable takes precedence over
/// fetch-required: one split that exists nowhere makes the task unrunnable.
pub fn validate_partitions<F>(
    meta: &Metadata,
    splits: &[SplitArg],
    target: ExecutorTarget,
    in_shared_arrays: F,
) -> Validation
where
    F: Fn(&str) -> bool,
{
    let mut off_target = Vec::new();
    let mut nowhere = Vec::new();

    for arg in splits {
        let name = arg.name.as_str();
        let at_worker = meta.splits.is_resident(name, ExecutorTarget::Worker) || in_shared_arrays(name);
        if !at_worker {
            nowhere.push(arg.name.clone());
            continue;
        }
        let at_target = match target {
            ExecutorTarget::Worker => true,
            ExecutorTarget::Executor(_) => meta.splits.is_resident(name, target),
        };
        if !at_target {
            off_target.push(arg.name.clone());
        }
    }

    if !nowhere.is_empty() {
        Validation::Unavailable { missing: nowhere }
    } else if !off_target.is_empty() {
        Validation::FetchRequired { missing: off_target }
    } else {
        Validation::AllAvailable
    }
}
