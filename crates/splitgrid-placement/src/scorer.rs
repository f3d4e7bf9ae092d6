//! Executor scoring for placement decisions.
//!
//! Each executor is scored on two axes, compared lexicographically:
//! - **Locality**: bytes of the task's splits already resident there
//! - **Load**: outstanding exec + persist work, then free memory headroom

use std::cmp::{Ordering, Reverse};

use splitgrid_core::{ExecutorId, SplitArg};
use splitgrid_state::{ExecutorLoad, Metadata};

/// Scored placement candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorScore {
    pub executor: ExecutorId,
    /// Sum of sizes of required splits resident on this executor.
    pub locality: u64,
    /// Outstanding execution plus persist work.
    pub pending: u64,
    /// Memory budget minus memory in use.
    pub headroom: u64,
}

impl ExecutorScore {
    /// Key where greater is better: more locality, less pending, more headroom.
    fn key(&self) -> (u64, Reverse<u64>, u64) {
        (self.locality, Reverse(self.pending), self.headroom)
    }

    /// Compare two candidates ignoring executor id.
    pub fn cmp_preference(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }

    /// Whether neither candidate is preferred over the other.
    pub fn ties_with(&self, other: &Self) -> bool {
        self.cmp_preference(other) == Ordering::Equal
    }
}

/// Score a single executor for a task requiring `splits`.
pub fn score_executor(
    meta: &Metadata,
    executor: ExecutorId,
    load: &ExecutorLoad,
    splits: &[SplitArg],
) -> ExecutorScore {
    let locality = splits
        .iter()
        .filter_map(|arg| meta.splits.get(&arg.name))
        .filter(|split| split.is_held_by(executor))
        .map(|split| split.size)
        .fold(0u64, u64::saturating_add);

    ExecutorScore {
        executor,
        locality,
        pending: load.pending(),
        headroom: load.headroom(meta.memory_budget),
    }
}

/// Score all registered executors and return them best first.
///
/// Equal candidates keep ascending id order.
pub fn rank_executors(meta: &Metadata, splits: &[SplitArg]) -> Vec<ExecutorScore> {
    let mut scores: Vec<ExecutorScore> = meta
        .loads
        .iter()
        .map(|(id, load)| score_executor(meta, id, load, splits))
        .collect();
    scores.sort_by(|a, b| b.cmp_preference(a).then(a.executor.cmp(&b.executor)));
    scores
}
