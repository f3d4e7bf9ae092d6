//! Placement engine — chooses the executor for a task.
//!
//! Given a task's required splits, the placer:
//! 1. Ranks executors by locality, then load (using scorer)
//! 2. Breaks exact ties with a stable hash, so a split that nobody holds
//!    yet keeps landing on the same executor and locality can build up

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use splitgrid_core::{ExecutorId, SplitArg, TaskId};
use splitgrid_state::Metadata;

use crate::scorer::{ExecutorScore, rank_executors};

/// Identifier hashed to break placement ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreakKey<'a> {
    Split(&'a str),
    Task(TaskId),
}

impl<'a> TieBreakKey<'a> {
    /// Key for a task: its largest required split, or the task id when it
    /// needs none. Equal sizes resolve to the smallest name, so argument
    /// order does not matter.
    pub fn for_task(splits: &'a [SplitArg], task: TaskId) -> Self {
        splits
            .iter()
            .max_by(|a, b| a.size.cmp(&b.size).then(b.name.cmp(&a.name)))
            .map_or(TieBreakKey::Task(task), |arg| TieBreakKey::Split(&arg.name))
    }
}

/// Hash `key` to a u64 that is stable across processes and releases.
pub fn stable_hash(key: TieBreakKey<'_>) -> u64 {
    let mut hasher = Sha256::new();
    match key {
        TieBreakKey::Split(name) => {
            hasher.update(b"split:");
            hasher.update(name.as_bytes());
        }
        TieBreakKey::Task(id) => {
            hasher.update(b"task:");
            hasher.update(id.to_le_bytes());
        }
    }
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(prefix)
}

/// Map `key` onto one of `executors`, which must be in ascending id order.
///
/// Returns `None` when there are no executors.
pub fn deterministic_executor(key: TieBreakKey<'_>, executors: &[ExecutorId]) -> Option<ExecutorId> {
    if executors.is_empty() {
        return None;
    }
    let index = (stable_hash(key) % executors.len() as u64) as usize;
    Some(executors[index])
}

/// A placement decision with the score that won it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub executor: ExecutorId,
    /// Resident bytes of the task's splits on the chosen executor.
    pub locality: u64,
    /// Whether several executors scored identically and the hash decided.
    pub tie_broken: bool,
}

/// Choose the best executor for a task requiring `splits`.
///
/// Returns `None` only if no executor is registered.
pub fn select_executor(meta: &Metadata, splits: &[SplitArg], task: TaskId) -> Option<Selection> {
    let ranked = rank_executors(meta, splits);
    let best = *ranked.first()?;

    let tied: Vec<&ExecutorScore> = ranked.iter().take_while(|s| s.ties_with(&best)).collect();
    if tied.len() == 1 {
        debug!(executor = %best.executor, locality = best.locality, task, "executor selected");
        return Some(Selection {
            executor: best.executor,
            locality: best.locality,
            tie_broken: false,
        });
    }

    // `tied` is in ascending id order; when every executor ties this is
    // exactly `deterministic_executor(key, all ids)`.
    let key = TieBreakKey::for_task(splits, task);
    let candidates: Vec<ExecutorId> = tied.iter().map(|s| s.executor).collect();
    let executor = deterministic_executor(key, &candidates)?;
    let pick = tied.iter().find(|s| s.executor == executor)?;
    debug!(
        executor = %pick.executor,
        candidates = tied.len(),
        ?key,
        task,
        "executor selected by tie-break"
    );
    Some(Selection {
        executor: pick.executor,
        locality: pick.locality,
        tie_broken: true,
    })
}
