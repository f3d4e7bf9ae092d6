//! LineageAffinity — pins every task of a lineage to one executor.
//!
//! Each lineage has its own slot behind its own lock, so resolutions for
//! different lineages run in parallel while resolutions for the same
//! lineage are serialized: the first caller computes the placement and
//! every later caller sees that same executor.
//!
//! Lifecycle per lineage: unplaced → pinned(executor) → released. A slot
//! is released once its last outstanding task completes; the next task
//! with that id starts over at unplaced.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use splitgrid_core::{ExecutorId, LineageId};

use crate::error::SchedulerResult;

#[derive(Debug, Default)]
struct Slot {
    pinned: Option<ExecutorId>,
    /// Tasks resolved for this lineage that have not completed yet.
    outstanding: u64,
    /// Set once the slot is removed from the table; holders must retry.
    released: bool,
}

/// Result of resolving a task's lineage to an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub executor: ExecutorId,
    /// True when the lineage was already pinned and no placement ran.
    pub affinity_hit: bool,
}

#[derive(Debug, Default)]
pub struct LineageAffinity {
    slots: Mutex<HashMap<LineageId, Arc<Mutex<Slot>>>>,
}

impl LineageAffinity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `lineage` to its executor and count one more outstanding task.
    ///
    /// `place` runs with the lineage's slot locked and receives the pinned
    /// executor, if any. It must return that executor unchanged when one
    /// is given; otherwise it makes the placement decision. An error from
    /// `place` leaves the lineage unplaced.
    pub fn resolve<F>(&self, lineage: LineageId, place: F) -> SchedulerResult<Resolution>
    where
        F: FnOnce(Option<ExecutorId>) -> SchedulerResult<ExecutorId>,
    {
        loop {
            let slot = {
                let mut slots = self.slots.lock();
                Arc::clone(slots.entry(lineage).or_default())
            };

            let mut guard = slot.lock();
            if guard.released {
                continue;
            }

            let pinned = guard.pinned;
            let executor = match place(pinned) {
                Ok(executor) => executor,
                Err(e) => {
                    if guard.pinned.is_none() && guard.outstanding == 0 {
                        guard.released = true;
                        self.remove_slot(lineage, &slot);
                    }
                    return Err(e);
                }
            };
            debug_assert!(
                pinned.is_none_or(|p| p == executor),
                "lineage {lineage} repinned from {pinned:?} to {executor}"
            );
            guard.pinned = Some(executor);
            guard.outstanding += 1;

            if pinned.is_none() {
                debug!(lineage, %executor, "lineage pinned");
            }
            return Ok(Resolution {
                executor,
                affinity_hit: pinned.is_some(),
            });
        }
    }

    /// Retire one outstanding task of `lineage`.
    ///
    /// Returns true if that was the last one and the lineage was released.
    pub fn complete(&self, lineage: LineageId) -> bool {
        let Some(slot) = self.slots.lock().get(&lineage).cloned() else {
            warn!(lineage, "completion for unknown lineage");
            return false;
        };

        let mut guard = slot.lock();
        if guard.released {
            return false;
        }
        debug_assert!(guard.outstanding > 0, "lineage {lineage} completed more tasks than resolved");
        guard.outstanding = guard.outstanding.saturating_sub(1);
        if guard.outstanding > 0 {
            return false;
        }
        guard.released = true;
        self.remove_slot(lineage, &slot);
        debug!(lineage, "lineage drained and released");
        true
    }

    /// Drop the entry for `lineage` regardless of outstanding tasks.
    pub fn release(&self, lineage: LineageId) -> bool {
        let Some(slot) = self.slots.lock().get(&lineage).cloned() else {
            return false;
        };
        let mut guard = slot.lock();
        if guard.released {
            return false;
        }
        guard.released = true;
        self.remove_slot(lineage, &slot);
        debug!(lineage, "lineage released");
        true
    }

    pub fn pinned(&self, lineage: LineageId) -> Option<ExecutorId> {
        let slot = self.slots.lock().get(&lineage).cloned()?;
        let guard = slot.lock();
        if guard.released { None } else { guard.pinned }
    }

    pub fn outstanding(&self, lineage: LineageId) -> u64 {
        let Some(slot) = self.slots.lock().get(&lineage).cloned() else {
            return 0;
        };
        let outstanding = slot.lock().outstanding;
        outstanding
    }

    /// Number of lineages currently tracked.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    // Called with the slot locked.
    fn remove_slot(&self, lineage: LineageId, slot: &Arc<Mutex<Slot>>) {
        let mut slots = self.slots.lock();
        if slots.get(&lineage).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(&lineage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchedulerError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn first_resolution_places_later_ones_hit() {
        let affinity = LineageAffinity::new();

        let first = affinity.resolve(7, |pinned| Ok(pinned.unwrap_or(ExecutorId(2)))).unwrap();
        assert_eq!(first, Resolution { executor: ExecutorId(2), affinity_hit: false });

        let second = affinity
            .resolve(7, |pinned| {
                assert_eq!(pinned, Some(ExecutorId(2)));
                Ok(pinned.unwrap())
            })
            .unwrap();
        assert!(second.affinity_hit);
        assert_eq!(affinity.outstanding(7), 2);
    }

    #[test]
    fn failed_placement_leaves_lineage_unplaced() {
        let affinity = LineageAffinity::new();
        let err = affinity.resolve(1, |_| Err(SchedulerError::NoExecutors));
        assert_eq!(err, Err(SchedulerError::NoExecutors));
        assert_eq!(affinity.pinned(1), None);
        assert_eq!(affinity.outstanding(1), 0);
        assert!(affinity.is_empty());
    }

    #[test]
    fn drained_lineage_is_released() {
        let affinity = LineageAffinity::new();
        affinity.resolve(3, |p| Ok(p.unwrap_or(ExecutorId(0)))).unwrap();
        affinity.resolve(3, |p| Ok(p.unwrap_or(ExecutorId(0)))).unwrap();

        assert!(!affinity.complete(3));
        assert_eq!(affinity.pinned(3), Some(ExecutorId(0)));
        assert!(affinity.complete(3));
        assert_eq!(affinity.pinned(3), None);
        assert!(affinity.is_empty());

        // Starting over places afresh.
        let again = affinity.resolve(3, |p| Ok(p.unwrap_or(ExecutorId(1)))).unwrap();
        assert_eq!(again, Resolution { executor: ExecutorId(1), affinity_hit: false });
    }

    #[test]
    fn completion_for_unknown_lineage_is_ignored() {
        let affinity = LineageAffinity::new();
        assert!(!affinity.complete(99));
        assert!(!affinity.release(99));
    }

    #[test]
    fn explicit_release_drops_entry() {
        let affinity = LineageAffinity::new();
        affinity.resolve(5, |p| Ok(p.unwrap_or(ExecutorId(0)))).unwrap();
        assert!(affinity.release(5));
        assert_eq!(affinity.len(), 0);
    }

    #[test]
    fn concurrent_resolutions_agree_and_place_once() {
        let affinity = Arc::new(LineageAffinity::new());
        let placements = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for t in 0..8u32 {
            let affinity = Arc::clone(&affinity);
            let placements = Arc::clone(&placements);
            handles.push(thread::spawn(move || {
                let mut seen = vec![];
                for _ in 0..50 {
                    let res = affinity
                        .resolve(42, |pinned| {
                            Ok(pinned.unwrap_or_else(|| {
                                placements.fetch_add(1, Ordering::SeqCst);
                                ExecutorId(t)
                            }))
                        })
                        .unwrap();
                    seen.push(res.executor);
                }
                seen
            }));
        }

        let mut all = vec![];
        for h in handles {
            all.extend(h.join().unwrap());
        }

        assert_eq!(placements.load(Ordering::SeqCst), 1);
        assert!(all.iter().all(|e| *e == all[0]));
        assert_eq!(affinity.outstanding(42), 400);
    }
}
