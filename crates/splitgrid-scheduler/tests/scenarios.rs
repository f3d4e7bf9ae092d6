//! End-to-end scheduling scenarios.
//!
//! Drives a `TaskScheduler` the way a worker's dispatch loop would:
//! stage partition writes, validate, resolve lineages, report completions
//! and delete splits.

use splitgrid_core::{ExecutorId, ExecutorTarget, SchedulerConfig, SplitArg};
use splitgrid_scheduler::*;

fn scheduler(executors: u32) -> TaskScheduler {
    TaskScheduler::new(&SchedulerConfig::with_executors(executors), SharedArrays::new()).unwrap()
}

#[test]
fn sole_holder_wins_then_delete_clears_it() {
    let sched = scheduler(3);
    sched.stage_updated_partition("S1", 100, ExecutorId(1));
    assert!(sched.is_split_available("S1", ExecutorId(1).into()));

    // Pile load on executor 1; locality still decides.
    sched.report_memory(ExecutorId(1), 900 << 20).unwrap();
    for i in 0..5 {
        sched.add_parent_task(&[SplitArg::new("S1", 100)], 500, i).unwrap();
    }
    assert_eq!(sched.executor_load(ExecutorId(1)).unwrap().exec_load, 5);
    let sel = sched.select_executor(&[SplitArg::new("S1", 100)], 7).unwrap();
    assert_eq!(sel.executor, ExecutorId(1));

    let res = sched.add_parent_task(&[SplitArg::new("S1", 100)], 1, 7).unwrap();
    assert_eq!(res.executor, ExecutorId(1));
    let before = sched.executor_load(ExecutorId(1)).unwrap().exec_load;

    let outcome = sched
        .foreach_complete(&TaskCompletion {
            executor: ExecutorId(1),
            lineage: 1,
            task: 7,
            succeeded: true,
            mem_used: Some(100),
        })
        .unwrap();
    assert_eq!(outcome.status, TaskStatus::Succeeded);
    assert_eq!(sched.executor_load(ExecutorId(1)).unwrap().exec_load, before - 1);

    sched.delete_split("S1");
    assert!(!sched.is_split_available("S1", ExecutorId(1).into()));
    assert!(!sched.is_split_available("S1", ExecutorTarget::Worker));
}

#[test]
fn fresh_split_maps_to_same_executor_for_distinct_tasks() {
    let sched = scheduler(3);
    let splits = vec![SplitArg::new("brand-new", 64)];

    let a = sched.select_executor(&splits, 11).unwrap();
    let b = sched.select_executor(&splits, 12).unwrap();
    assert_eq!(a.executor, b.executor);
    assert_eq!(
        Ok(a.executor),
        sched.deterministic_executor(TieBreakKey::Split("brand-new"))
    );
}

#[test]
fn staged_write_becomes_persist_source() {
    let sched = scheduler(2);
    sched.stage_updated_partition("S9", 42, ExecutorId(0));

    assert!(sched.is_split_available("S9", ExecutorId(0).into()));
    let source = sched.executor_to_persist_from("S9").unwrap();
    let info = sched.split_info("S9").unwrap();
    assert!(info.holders.contains(&source));
    assert_eq!(info.size, 42);
}

#[test]
fn duplicate_stage_is_last_write_wins() {
    let sched = scheduler(2);
    sched.stage_updated_partition("S1", 10, ExecutorId(0));
    sched.stage_updated_partition("S1", 30, ExecutorId(0));

    let info = sched.split_info("S1").unwrap();
    assert_eq!(info.size, 30);
    assert_eq!(info.holders.len(), 1);
}

#[test]
fn validation_outcomes() {
    let sched = scheduler(2);
    sched.stage_updated_partition("A", 10, ExecutorId(0));
    sched.stage_updated_partition("B", 10, ExecutorId(1));

    let a = [SplitArg::new("A", 10)];
    let ab = [SplitArg::new("A", 10), SplitArg::new("B", 10)];
    let az = [SplitArg::new("A", 10), SplitArg::new("Z", 10)];

    assert_eq!(sched.validate_partitions(&a, ExecutorId(0).into(), 1), Validation::AllAvailable);
    assert_eq!(
        sched.validate_partitions(&ab, ExecutorId(0).into(), 2),
        Validation::FetchRequired { missing: vec!["B".into()] }
    );
    assert_eq!(
        sched.validate_partitions(&az, ExecutorId(0).into(), 3),
        Validation::Unavailable { missing: vec!["Z".into()] }
    );
    assert_eq!(sched.validate_partitions(&ab, ExecutorTarget::Worker, 4), Validation::AllAvailable);
}

#[test]
fn persisted_split_validates_at_worker_level_after_holders_lost() {
    let arrays = SharedArrays::new();
    let sched = TaskScheduler::new(&SchedulerConfig::with_executors(2), arrays.clone()).unwrap();
    arrays.insert("P");

    let p = [SplitArg::new("P", 10)];
    assert_eq!(sched.validate_partitions(&p, ExecutorTarget::Worker, 1), Validation::AllAvailable);
    assert_eq!(
        sched.validate_partitions(&p, ExecutorId(1).into(), 1),
        Validation::FetchRequired { missing: vec!["P".into()] }
    );
}

#[test]
fn lineage_runs_on_one_executor_until_drained() {
    let sched = scheduler(4);
    sched.stage_updated_partition("X", 10, ExecutorId(3));

    let first = sched.add_parent_task(&[SplitArg::new("X", 10)], 77, 1).unwrap();
    assert_eq!(first.executor, ExecutorId(3));

    // Later tasks of the lineage follow the pin even if locality moves.
    sched.stage_updated_partition("Y", 1000, ExecutorId(0));
    let second = sched.add_parent_task(&[SplitArg::new("Y", 1000)], 77, 2).unwrap();
    assert_eq!(second.executor, ExecutorId(3));
    assert!(second.affinity_hit);

    for task in [1, 2] {
        sched
            .foreach_complete(&TaskCompletion {
                executor: ExecutorId(3),
                lineage: 77,
                task,
                succeeded: true,
                mem_used: None,
            })
            .unwrap();
    }
    assert_eq!(sched.pinned_executor(77), None);

    // A new run of the same id is placed afresh.
    let third = sched.add_parent_task(&[SplitArg::new("Y", 1000)], 77, 3).unwrap();
    assert_eq!(third.executor, ExecutorId(0));
    assert!(!third.affinity_hit);
}
