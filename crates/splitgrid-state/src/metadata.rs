//! Metadata — the split registry and load table as one consistent region.
//!
//! Placement reads both tables in a single decision, so they sit behind
//! one guard and helpers receive `&Metadata` instead of re-locking.

use splitgrid_core::ExecutorId;
use tracing::warn;

use crate::error::StateResult;
use crate::load::ExecutorLoadTable;
use crate::registry::SplitRegistry;
use crate::types::StagedUpdate;

#[derive(Debug, Clone)]
pub struct Metadata {
    pub splits: SplitRegistry,
    pub loads: ExecutorLoadTable,
    /// Per-executor memory budget in bytes.
    pub memory_budget: u64,
}

impl Metadata {
    pub fn new(memory_budget: u64) -> Self {
        Self {
            splits: SplitRegistry::new(),
            loads: ExecutorLoadTable::new(),
            memory_budget,
        }
    }

    /// Register executors `0..count`.
    pub fn with_executors(count: u32, memory_budget: u64) -> StateResult<Self> {
        let mut meta = Self::new(memory_budget);
        for id in 0..count {
            meta.loads.add_executor(ExecutorId(id))?;
        }
        Ok(meta)
    }

    /// Fold staged updates into the registry. Returns how many were applied.
    ///
    /// Updates naming an executor that was never registered are dropped:
    /// every holder must be a live executor.
    pub fn merge(&mut self, updates: Vec<StagedUpdate>) -> usize {
        let mut applied = 0;
        for update in updates {
            if !self.loads.contains(update.executor) {
                warn!(
                    split = %update.name,
                    executor = %update.executor,
                    "dropping staged update from unregistered executor"
                );
                continue;
            }
            self.splits.apply(update);
            applied += 1;
        }
        applied
    }

    /// Pick the holder of `name` a persist should be sourced from.
    ///
    /// Lowest persist load wins, then lowest executor id, so repeated calls
    /// against unchanged state agree.
    pub fn persist_source_for(&self, name: &str) -> Option<ExecutorId> {
        let split = self.splits.get(name)?;
        split
            .holders
            .iter()
            .copied()
            .min_by_key(|id| {
                let persist_load = self.loads.sample(*id).map_or(u64::MAX, |s| s.persist_load);
                (persist_load, *id)
            })
    }
}
