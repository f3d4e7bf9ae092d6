//! Domain types for the SplitGrid state tables.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use splitgrid_core::ExecutorId;

// ── Split ──────────────────────────────────────────────────────────

/// A named partition of a distributed array and the executors holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub name: String,
    /// Size in bytes, as last reported by a producing executor.
    pub size: u64,
    /// Executors with a resident copy. Ordered so iteration is stable.
    pub holders: BTreeSet<ExecutorId>,
    /// Executor a persist of this split has been reserved on, if any.
    pub persisting: Option<ExecutorId>,
}

impl Split {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            holders: BTreeSet::new(),
            persisting: None,
        }
    }

    pub fn is_held_by(&self, executor: ExecutorId) -> bool {
        self.holders.contains(&executor)
    }
}

// ── Staged update ──────────────────────────────────────────────────

/// A split write reported by an executor but not yet merged into the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedUpdate {
    pub name: String,
    pub size: u64,
    pub executor: ExecutorId,
}

// ── Executor load ──────────────────────────────────────────────────

/// Point-in-time load of one executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorLoad {
    /// Outstanding persist operations sourced from this executor.
    pub persist_load: u64,
    /// Outstanding task executions dispatched to this executor.
    pub exec_load: u64,
    /// Bytes of memory in use, as last reported.
    pub mem_used: u64,
}

impl ExecutorLoad {
    /// Total outstanding work, persist and execution combined.
    pub fn pending(&self) -> u64 {
        self.exec_load.saturating_add(self.persist_load)
    }

    /// Bytes left before `budget` is exhausted.
    pub fn headroom(&self, budget: u64) -> u64 {
        budget.saturating_sub(self.mem_used)
    }
}
