//! ExecutorLoadTable — one load sample per registered executor.
//!
//! Samples are overwritten in place and never removed: an executor keeps
//! its id for the lifetime of the worker.

use std::collections::BTreeMap;

use splitgrid_core::ExecutorId;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::types::ExecutorLoad;

#[derive(Debug, Clone, Default)]
pub struct ExecutorLoadTable {
    samples: BTreeMap<ExecutorId, ExecutorLoad>,
}

impl ExecutorLoadTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor with a zeroed sample.
    pub fn add_executor(&mut self, id: ExecutorId) -> StateResult<()> {
        if self.samples.contains_key(&id) {
            return Err(StateError::DuplicateExecutor(id));
        }
        self.samples.insert(id, ExecutorLoad::default());
        debug!(executor = %id, "executor registered");
        Ok(())
    }

    /// The id the next executor added to the pool should take.
    pub fn next_id(&self) -> StateResult<ExecutorId> {
        match self.samples.keys().next_back() {
            None => Ok(ExecutorId(0)),
            Some(last) => last
                .0
                .checked_add(1)
                .map(ExecutorId)
                .ok_or(StateError::IdsExhausted),
        }
    }

    pub fn contains(&self, id: ExecutorId) -> bool {
        self.samples.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Read-only snapshot of one executor's load.
    pub fn sample(&self, id: ExecutorId) -> Option<ExecutorLoad> {
        self.samples.get(&id).copied()
    }

    /// Registered executors in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (ExecutorId, &ExecutorLoad)> {
        self.samples.iter().map(|(id, load)| (*id, load))
    }

    pub fn ids(&self) -> impl Iterator<Item = ExecutorId> + '_ {
        self.samples.keys().copied()
    }

    pub fn on_task_dispatched(&mut self, id: ExecutorId) -> StateResult<()> {
        let load = self.sample_mut(id)?;
        load.exec_load += 1;
        Ok(())
    }

    /// Retire one unit of execution load and take the latest memory report.
    ///
    /// A completion with nothing outstanding (never dispatched, or reported
    /// twice) is rejected; the memory report is still recorded.
    pub fn on_task_complete(&mut self, id: ExecutorId, mem_used: Option<u64>) -> StateResult<()> {
        let load = self.sample_mut(id)?;
        if let Some(bytes) = mem_used {
            load.mem_used = bytes;
        }
        if load.exec_load == 0 {
            return Err(StateError::NoOutstandingWork(id));
        }
        load.exec_load -= 1;
        Ok(())
    }

    pub fn on_persist_reserved(&mut self, id: ExecutorId) -> StateResult<()> {
        let load = self.sample_mut(id)?;
        load.persist_load += 1;
        Ok(())
    }

    pub fn on_persist_finished(&mut self, id: ExecutorId) -> StateResult<()> {
        let load = self.sample_mut(id)?;
        debug_assert!(load.persist_load > 0, "persist finished without reservation on {id}");
        load.persist_load = load.persist_load.saturating_sub(1);
        Ok(())
    }

    pub fn report_memory(&mut self, id: ExecutorId, mem_used: u64) -> StateResult<()> {
        self.sample_mut(id)?.mem_used = mem_used;
        Ok(())
    }

    fn sample_mut(&mut self, id: ExecutorId) -> StateResult<&mut ExecutorLoad> {
        self.samples
            .get_mut(&id)
            .ok_or(StateError::UnknownExecutor(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(n: u32) -> ExecutorLoadTable {
        let mut table = ExecutorLoadTable::new();
        for i in 0..n {
            table.add_executor(ExecutorId(i)).unwrap();
        }
        table
    }

    #[test]
    fn add_executor_zero_initializes() {
        let table = table_with(3);
        assert_eq!(table.len(), 3);
        for id in table.ids() {
            assert_eq!(table.sample(id), Some(ExecutorLoad::default()));
        }
    }

    #[test]
    fn duplicate_add_fails_without_corrupting_state() {
        let mut table = table_with(2);
        table.on_task_dispatched(ExecutorId(1)).unwrap();
        table.report_memory(ExecutorId(1), 500).unwrap();

        assert_eq!(
            table.add_executor(ExecutorId(1)),
            Err(StateError::DuplicateExecutor(ExecutorId(1)))
        );

        assert_eq!(table.len(), 2);
        let sample = table.sample(ExecutorId(1)).unwrap();
        assert_eq!(sample.exec_load, 1);
        assert_eq!(sample.mem_used, 500);
    }

    #[test]
    fn next_id_follows_highest() {
        let mut table = ExecutorLoadTable::new();
        assert_eq!(table.next_id(), Ok(ExecutorId(0)));
        table.add_executor(ExecutorId(0)).unwrap();
        table.add_executor(ExecutorId(1)).unwrap();
        assert_eq!(table.next_id(), Ok(ExecutorId(2)));
    }

    #[test]
    fn next_id_after_max_is_exhausted() {
        let mut table = ExecutorLoadTable::new();
        table.add_executor(ExecutorId(u32::MAX)).unwrap();
        assert_eq!(table.next_id(), Err(StateError::IdsExhausted));
    }

    #[test]
    fn completion_without_dispatch_is_rejected() {
        let mut table = table_with(1);
        let id = ExecutorId(0);
        assert_eq!(
            table.on_task_complete(id, Some(64)),
            Err(StateError::NoOutstandingWork(id))
        );
        let sample = table.sample(id).unwrap();
        assert_eq!(sample.exec_load, 0);
        assert_eq!(sample.mem_used, 64);
    }

    #[test]
    fn duplicate_completion_is_rejected() {
        let mut table = table_with(1);
        let id = ExecutorId(0);
        table.on_task_dispatched(id).unwrap();
        table.on_task_complete(id, None).unwrap();
        assert_eq!(
            table.on_task_complete(id, None),
            Err(StateError::NoOutstandingWork(id))
        );
        assert_eq!(table.sample(id).unwrap().exec_load, 0);
    }

    #[test]
    fn completion_decrements_exec_load_and_updates_memory() {
        let mut table = table_with(1);
        let id = ExecutorId(0);
        table.on_task_dispatched(id).unwrap();
        table.on_task_dispatched(id).unwrap();

        table.on_task_complete(id, Some(1024)).unwrap();
        let sample = table.sample(id).unwrap();
        assert_eq!(sample.exec_load, 1);
        assert_eq!(sample.mem_used, 1024);

        // No memory report leaves the previous value in place.
        table.on_task_complete(id, None).unwrap();
        let sample = table.sample(id).unwrap();
        assert_eq!(sample.exec_load, 0);
        assert_eq!(sample.mem_used, 1024);
    }

    #[test]
    fn persist_load_tracks_reservations() {
        let mut table = table_with(1);
        let id = ExecutorId(0);
        table.on_persist_reserved(id).unwrap();
        table.on_persist_reserved(id).unwrap();
        table.on_persist_finished(id).unwrap();
        assert_eq!(table.sample(id).unwrap().persist_load, 1);
    }

    #[test]
    fn unknown_executor_is_rejected() {
        let mut table = table_with(1);
        assert_eq!(
            table.on_task_dispatched(ExecutorId(9)),
            Err(StateError::UnknownExecutor(ExecutorId(9)))
        );
        assert!(table.sample(ExecutorId(9)).is_none());
    }
}
