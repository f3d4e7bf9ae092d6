//! StagingBuffer — split writes waiting to be merged into the registry.
//!
//! Keyed by `(split, executor)`: staging the same pair twice before a
//! merge keeps only the last reported size.

use std::collections::HashMap;

use splitgrid_core::ExecutorId;

use crate::types::StagedUpdate;

#[derive(Debug, Default)]
pub struct StagingBuffer {
    pending: HashMap<(String, ExecutorId), u64>,
}

impl StagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, name: &str, size: u64, executor: ExecutorId) {
        self.pending.insert((name.to_string(), executor), size);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every pending update, leaving the buffer empty.
    ///
    /// Updates come back ordered by split name then executor id.
    pub fn drain(&mut self) -> Vec<StagedUpdate> {
        let mut updates: Vec<StagedUpdate> = self
            .pending
            .drain()
            .map(|((name, executor), size)| StagedUpdate {
                name,
                size,
                executor,
            })
            .collect();
        updates.sort_by(|a, b| a.name.cmp(&b.name).then(a.executor.cmp(&b.executor)));
        updates
    }

    /// Drop every pending update for `name`. Returns how many were dropped.
    pub fn discard_split(&mut self, name: &str) -> usize {
        let before = self.pending.len();
        self.pending.retain(|(split, _), _| split != name);
        before - self.pending.len()
    }
}
