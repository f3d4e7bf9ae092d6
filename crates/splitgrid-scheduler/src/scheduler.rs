//! TaskScheduler — decides which local executor runs each task.
//!
//! The dispatch path of a worker calls, per task:
//! 1. [`validate_partitions`](TaskScheduler::validate_partitions) to learn
//!    whether the task's splits are where it would run
//! 2. [`add_parent_task`](TaskScheduler::add_parent_task) to resolve the
//!    task's lineage to an executor (placing it on first sight)
//!
//! Executors report back through
//! [`foreach_complete`](TaskScheduler::foreach_complete); data-layer
//! events arrive through
//! [`stage_updated_partition`](TaskScheduler::stage_updated_partition)
//! and [`delete_split`](TaskScheduler::delete_split).
//!
//! Every method takes `&self` and is safe to call from many threads.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use splitgrid_core::{ExecutorId, ExecutorTarget, LineageId, SchedulerConfig, SplitArg, TaskId};
use splitgrid_placement::{Selection, TieBreakKey, Validation};
use splitgrid_state::{ExecutorLoad, Metadata, Split, StateError};

use crate::affinity::{LineageAffinity, Resolution};
use crate::error::{SchedulerError, SchedulerResult};
use crate::guard::{ConsistentView, MetadataGuard};
use crate::shared_arrays::SharedArrays;

/// Completion report sent by an executor when a task finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub executor: ExecutorId,
    pub lineage: LineageId,
    pub task: TaskId,
    pub succeeded: bool,
    /// Executor memory in use after the task, if reported.
    #[serde(default)]
    pub mem_used: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded,
    Failed,
}

/// What the scheduler did with a completion. Failures are reported, not
/// retried: retry policy belongs to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub status: TaskStatus,
    /// True when this was the lineage's last outstanding task.
    pub lineage_released: bool,
}

pub struct TaskScheduler {
    meta: MetadataGuard,
    affinity: LineageAffinity,
    shared_arrays: SharedArrays,
}

impl TaskScheduler {
    /// Create a scheduler with executors `0..config.scheduler.executors`.
    pub fn new(config: &SchedulerConfig, shared_arrays: SharedArrays) -> SchedulerResult<Self> {
        let section = &config.scheduler;
        let metadata = Metadata::with_executors(section.executors, section.executor_memory_budget)?;
        info!(
            executors = section.executors,
            memory_budget = section.executor_memory_budget,
            "task scheduler created"
        );
        Ok(Self {
            meta: MetadataGuard::new(metadata),
            affinity: LineageAffinity::new(),
            shared_arrays,
        })
    }

    // ── Executors ──────────────────────────────────────────────────

    /// Register executor `id`. Fails if it is already registered.
    pub fn add_executor(&self, id: ExecutorId) -> SchedulerResult<()> {
        self.meta.consistent().loads.add_executor(id)?;
        info!(executor = %id, "executor added");
        Ok(())
    }

    /// Register the next executor of a growing pool and return its id.
    pub fn grow_pool(&self) -> SchedulerResult<ExecutorId> {
        let mut meta = self.meta.consistent();
        let id = meta.loads.next_id()?;
        meta.loads.add_executor(id)?;
        info!(executor = %id, "executor pool grew");
        Ok(id)
    }

    pub fn executor_count(&self) -> usize {
        self.meta.consistent().loads.len()
    }

    pub fn executor_load(&self, id: ExecutorId) -> Option<ExecutorLoad> {
        self.meta.consistent().loads.sample(id)
    }

    /// Record a memory report received outside a task completion.
    pub fn report_memory(&self, id: ExecutorId, mem_used: u64) -> SchedulerResult<()> {
        self.meta
            .consistent()
            .loads
            .report_memory(id, mem_used)
            .map_err(|_| SchedulerError::UnknownExecutor(id))
    }

    // ── Dispatch path ──────────────────────────────────────────────

    /// Classify a task's splits against `target`. Performs no transfer.
    pub fn validate_partitions(
        &self,
        splits: &[SplitArg],
        target: ExecutorTarget,
        task: TaskId,
    ) -> Validation {
        // Membership is read and the shared-array lock released before the
        // metadata guard is taken.
        let shared: Vec<bool> = {
            let arrays = self.shared_arrays.lock();
            splits.iter().map(|arg| arrays.contains(&arg.name)).collect()
        };
        let in_shared = |name: &str| {
            splits
                .iter()
                .zip(&shared)
                .any(|(arg, present)| *present && arg.name == name)
        };

        let meta = self.meta.consistent();
        let outcome = splitgrid_placement::validate_partitions(&meta, splits, target, in_shared);
        drop(meta);

        match &outcome {
            Validation::AllAvailable => {}
            Validation::FetchRequired { missing } => {
                debug!(task, ?target, missing = missing.len(), "fetch required");
            }
            Validation::Unavailable { missing } => {
                warn!(task, ?target, ?missing, "required splits unavailable on this worker");
            }
        }
        outcome
    }

    /// Resolve the executor for a task of lineage `lineage`.
    ///
    /// The first task of a lineage is placed by the placement engine and
    /// pins the lineage; later tasks reuse the pin. Each call counts as a
    /// dispatch: one unit of execution load on the executor and one
    /// outstanding task on the lineage.
    pub fn add_parent_task(
        &self,
        splits: &[SplitArg],
        lineage: LineageId,
        task: TaskId,
    ) -> SchedulerResult<Resolution> {
        self.affinity.resolve(lineage, |pinned| {
            let mut meta = self.meta.consistent();
            let executor = match pinned {
                Some(executor) => executor,
                None => best_executor(&meta, splits, task)?.executor,
            };
            meta.loads.on_task_dispatched(executor)?;
            Ok(executor)
        })
    }

    /// Best executor for `splits` against the current state, without
    /// pinning anything or recording a dispatch.
    pub fn select_executor(&self, splits: &[SplitArg], task: TaskId) -> SchedulerResult<Selection> {
        best_executor(&self.meta.consistent(), splits, task)
    }

    /// The executor a split or task id hashes to when nothing else decides.
    pub fn deterministic_executor(&self, key: TieBreakKey<'_>) -> SchedulerResult<ExecutorId> {
        let ids: Vec<ExecutorId> = self.meta.consistent().loads.ids().collect();
        splitgrid_placement::deterministic_executor(key, &ids).ok_or(SchedulerError::NoExecutors)
    }

    pub fn pinned_executor(&self, lineage: LineageId) -> Option<ExecutorId> {
        self.affinity.pinned(lineage)
    }

    /// Drop a lineage's pin without waiting for its tasks to drain.
    pub fn release_lineage(&self, lineage: LineageId) -> bool {
        self.affinity.release(lineage)
    }

    /// Take an executor's completion report.
    ///
    /// Retires one unit of execution load, records the memory report and,
    /// when the lineage has no outstanding tasks left, releases its pin.
    /// A report with no matching dispatch (never dispatched, or reported
    /// twice) is refused with [`SchedulerError::UnmatchedCompletion`] and
    /// leaves the lineage untouched.
    pub fn foreach_complete(&self, completion: &TaskCompletion) -> SchedulerResult<CompletionOutcome> {
        let recorded = self
            .meta
            .consistent()
            .loads
            .on_task_complete(completion.executor, completion.mem_used);
        match recorded {
            Ok(()) => {}
            Err(StateError::NoOutstandingWork(executor)) => {
                warn!(
                    %executor,
                    lineage = completion.lineage,
                    task = completion.task,
                    "completion without matching dispatch"
                );
                return Err(SchedulerError::UnmatchedCompletion(executor));
            }
            Err(_) => return Err(SchedulerError::UnknownExecutor(completion.executor)),
        }

        let lineage_released = self.affinity.complete(completion.lineage);
        let status = if completion.succeeded {
            TaskStatus::Succeeded
        } else {
            warn!(
                executor = %completion.executor,
                lineage = completion.lineage,
                task = completion.task,
                "task failed"
            );
            TaskStatus::Failed
        };
        debug!(
            executor = %completion.executor,
            lineage = completion.lineage,
            task = completion.task,
            lineage_released,
            "task completion recorded"
        );
        Ok(CompletionOutcome {
            status,
            lineage_released,
        })
    }

    // ── Split registry ─────────────────────────────────────────────

    /// Record that `executor` wrote `name`. Visible after the next merge.
    pub fn stage_updated_partition(&self, name: &str, size: u64, executor: ExecutorId) {
        self.meta.stage(name, size, executor);
        debug!(split = name, size, %executor, "partition update staged");
    }

    /// Whether `name` is resident at `target`.
    ///
    /// At worker level a split also counts when it is in the shared-memory
    /// array set.
    pub fn is_split_available(&self, name: &str, target: ExecutorTarget) -> bool {
        let shared = matches!(target, ExecutorTarget::Worker) && self.shared_arrays.contains(name);
        shared || self.meta.consistent().splits.is_resident(name, target)
    }

    pub fn is_being_persisted(&self, name: &str) -> bool {
        self.meta.consistent().splits.is_being_persisted(name)
    }

    /// The holder a persist of `name` should be sourced from.
    pub fn executor_to_persist_from(&self, name: &str) -> Option<ExecutorId> {
        self.meta.consistent().persist_source_for(name)
    }

    /// Reserve a persist of `name` and return the executor to run it on.
    ///
    /// Returns `None` if no executor holds the split or a persist of it is
    /// already in flight.
    pub fn reserve_persist(&self, name: &str) -> Option<ExecutorId> {
        let mut meta = self.meta.consistent();
        reserve_persist_in(&mut meta, name)
    }

    /// Finish a reserved persist. On success the split becomes durably
    /// present at worker level.
    pub fn complete_persist(&self, name: &str, succeeded: bool) -> SchedulerResult<()> {
        let mut arrays = self.shared_arrays.lock();
        let mut meta = self.meta.consistent();
        let Some(executor) = meta.splits.finish_persist(name) else {
            warn!(split = name, "persist completion without reservation");
            return Ok(());
        };
        meta.loads.on_persist_finished(executor)?;
        if succeeded {
            arrays.insert(name.to_string());
        }
        debug!(split = name, %executor, succeeded, "persist finished");
        Ok(())
    }

    /// Forget `name` everywhere: registry entry, staged updates and the
    /// shared-array set. No-op if it is unknown.
    pub fn delete_split(&self, name: &str) {
        let discarded = self.meta.discard_staged(name);
        let mut arrays = self.shared_arrays.lock();
        // Anything staged for `name` after the discard is merged by the
        // consistent view and removed with the entry below.
        let mut meta = self.meta.consistent();
        let removed = meta.splits.remove(name);
        if let Some(split) = &removed {
            if let Some(executor) = split.persisting {
                // Reservation dies with the split; release the load it held.
                let released = meta.loads.on_persist_finished(executor);
                debug_assert!(released.is_ok(), "persisting on unregistered {executor}");
            }
        }
        let was_shared = arrays.remove(name);
        drop(meta);
        drop(arrays);

        if removed.is_some() || was_shared || discarded > 0 {
            debug!(split = name, was_shared, discarded, "split deleted");
        }
    }

    /// Snapshot of a split's registry entry.
    pub fn split_info(&self, name: &str) -> Option<Split> {
        self.meta.consistent().splits.get(name).cloned()
    }
}

fn best_executor(meta: &Metadata, splits: &[SplitArg], task: TaskId) -> SchedulerResult<Selection> {
    splitgrid_placement::select_executor(meta, splits, task).ok_or(SchedulerError::NoExecutors)
}

fn reserve_persist_in(meta: &mut ConsistentView<'_>, name: &str) -> Option<ExecutorId> {
    if meta.splits.is_being_persisted(name) {
        return None;
    }
    let source = meta.persist_source_for(name)?;
    if !meta.splits.reserve_persist(name, source) {
        return None;
    }
    if meta.loads.on_persist_reserved(source).is_err() {
        debug_assert!(false, "persist source {source} is not registered");
        meta.splits.finish_persist(name);
        return None;
    }
    debug!(split = name, executor = %source, "persist reserved");
    Some(source)
}
