//! SplitRegistry — where each split of the distributed array lives.
//!
//! Maps split name to its size and the set of executors holding a
//! resident copy. Only merged updates are visible here; staged writes
//! live in [`StagingBuffer`](crate::StagingBuffer) until folded in.

use std::collections::HashMap;

use splitgrid_core::{ExecutorId, ExecutorTarget};
use tracing::debug;

use crate::types::{Split, StagedUpdate};

#[derive(Debug, Clone, Default)]
pub struct SplitRegistry {
    splits: HashMap<String, Split>,
}

impl SplitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Split> {
        self.splits.get(name)
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Fold one staged update into its split entry.
    ///
    /// Creates the entry if needed, adds the executor to the holder set
    /// (a set, so repeated merges never duplicate it) and takes the
    /// staged size.
    pub fn apply(&mut self, update: StagedUpdate) {
        let split = self
            .splits
            .entry(update.name.clone())
            .or_insert_with(|| Split::new(update.name.clone(), update.size));
        split.size = update.size;
        let added = split.holders.insert(update.executor);
        debug!(
            split = %update.name,
            executor = %update.executor,
            size = update.size,
            added,
            "staged update merged"
        );
    }

    /// Whether some executor holds a resident copy of `name`.
    pub fn is_resident(&self, name: &str, target: ExecutorTarget) -> bool {
        match (self.splits.get(name), target) {
            (Some(split), ExecutorTarget::Executor(id)) => split.is_held_by(id),
            (Some(split), ExecutorTarget::Worker) => !split.holders.is_empty(),
            (None, _) => false,
        }
    }

    pub fn is_being_persisted(&self, name: &str) -> bool {
        self.splits
            .get(name)
            .is_some_and(|split| split.persisting.is_some())
    }

    /// Mark a persist of `name` as in flight on `executor`.
    ///
    /// Returns false if the split is unknown or already reserved.
    pub fn reserve_persist(&mut self, name: &str, executor: ExecutorId) -> bool {
        match self.splits.get_mut(name) {
            Some(split) if split.persisting.is_none() => {
                split.persisting = Some(executor);
                true
            }
            _ => false,
        }
    }

    /// Clear the persist reservation on `name`, returning the executor it was on.
    pub fn finish_persist(&mut self, name: &str) -> Option<ExecutorId> {
        self.splits.get_mut(name)?.persisting.take()
    }

    /// Remove a split entirely. No-op if absent.
    pub fn remove(&mut self, name: &str) -> Option<Split> {
        self.splits.remove(name)
    }
}
