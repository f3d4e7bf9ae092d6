use std::io::Read;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use splitgrid_core::{ExecutorId, ExecutorTarget, LineageId, SchedulerConfig, SplitArg, TaskId};
use splitgrid_scheduler::{SharedArrays, TaskCompletion, TaskScheduler};

/// One step of a replay script.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Event {
    Stage {
        split: String,
        size: u64,
        executor: ExecutorId,
    },
    Validate {
        splits: Vec<SplitArg>,
        /// Executor to validate against; worker level when absent.
        #[serde(default)]
        executor: Option<ExecutorId>,
        task: TaskId,
    },
    Dispatch {
        splits: Vec<SplitArg>,
        lineage: LineageId,
        task: TaskId,
    },
    Complete(TaskCompletion),
    ReservePersist {
        split: String,
    },
    CompletePersist {
        split: String,
        succeeded: bool,
    },
    Delete {
        split: String,
    },
    GrowPool,
    ReportMemory {
        executor: ExecutorId,
        mem_used: u64,
    },
}

pub fn replay(config: &SchedulerConfig, source: &str) -> anyhow::Result<()> {
    let script = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source)?
    };
    let events: Vec<Event> = serde_json::from_str(&script)?;

    let scheduler = TaskScheduler::new(config, SharedArrays::new())?;
    info!(events = events.len(), "replaying event script");

    for line in run(&scheduler, events) {
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

/// Apply `events` in order, returning one JSON record per event.
///
/// Scheduler errors are reported in the record rather than aborting the
/// replay, the same way a dispatch loop would surface them per task.
pub fn run(scheduler: &TaskScheduler, events: Vec<Event>) -> Vec<Value> {
    events
        .into_iter()
        .map(|event| apply(scheduler, event))
        .collect()
}

fn apply(scheduler: &TaskScheduler, event: Event) -> Value {
    match event {
        Event::Stage { split, size, executor } => {
            scheduler.stage_updated_partition(&split, size, executor);
            json!({ "op": "stage", "split": split })
        }
        Event::Validate { splits, executor, task } => {
            let target = executor.map_or(ExecutorTarget::Worker, ExecutorTarget::Executor);
            let outcome = scheduler.validate_partitions(&splits, target, task);
            json!({ "op": "validate", "task": task, "result": outcome })
        }
        Event::Dispatch { splits, lineage, task } => {
            match scheduler.add_parent_task(&splits, lineage, task) {
                Ok(resolution) => json!({ "op": "dispatch", "task": task, "result": resolution }),
                Err(e) => json!({ "op": "dispatch", "task": task, "error": e.to_string() }),
            }
        }
        Event::Complete(completion) => match scheduler.foreach_complete(&completion) {
            Ok(outcome) => json!({ "op": "complete", "task": completion.task, "result": outcome }),
            Err(e) => json!({ "op": "complete", "task": completion.task, "error": e.to_string() }),
        },
        Event::ReservePersist { split } => {
            let source = scheduler.reserve_persist(&split);
            json!({ "op": "reserve_persist", "split": split, "executor": source })
        }
        Event::CompletePersist { split, succeeded } => {
            match scheduler.complete_persist(&split, succeeded) {
                Ok(()) => json!({ "op": "complete_persist", "split": split }),
                Err(e) => json!({ "op": "complete_persist", "split": split, "error": e.to_string() }),
            }
        }
        Event::Delete { split } => {
            scheduler.delete_split(&split);
            json!({ "op": "delete", "split": split })
        }
        Event::GrowPool => match scheduler.grow_pool() {
            Ok(executor) => json!({ "op": "grow_pool", "executor": executor }),
            Err(e) => json!({ "op": "grow_pool", "error": e.to_string() }),
        },
        Event::ReportMemory { executor, mem_used } => {
            match scheduler.report_memory(executor, mem_used) {
                Ok(()) => json!({ "op": "report_memory", "executor": executor }),
                Err(e) => json!({ "op": "report_memory", "executor": executor, "error": e.to_string() }),
            }
        }
    }
}
