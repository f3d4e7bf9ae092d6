//! Lock discipline for the scheduler's shared state.
//!
//! Locks are always taken in this order, and a holder never reaches back
//! for an earlier one:
//!
//! ```text
//! lineage slot → shared-array set → metadata → staging buffer
//! ```
//!
//! The lineage table's own map lock is a leaf: nothing else is acquired
//! while it is held. Helpers that need registry state take a
//! [`ConsistentView`] argument instead of locking again.

use parking_lot::{Mutex, MutexGuard};
use tracing::trace;

use splitgrid_core::ExecutorId;
use splitgrid_state::{Metadata, StagingBuffer};

/// Metadata with every staged update folded in, held under its guard.
pub type ConsistentView<'a> = MutexGuard<'a, Metadata>;

pub struct MetadataGuard {
    metadata: Mutex<Metadata>,
    staging: Mutex<StagingBuffer>,
}

impl MetadataGuard {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata: Mutex::new(metadata),
            staging: Mutex::new(StagingBuffer::new()),
        }
    }

    /// Record a split write without touching the registry.
    pub fn stage(&self, name: &str, size: u64, executor: ExecutorId) {
        self.staging.lock().stage(name, size, executor);
    }

    /// Drop staged updates for `name` that have not been merged yet.
    pub fn discard_staged(&self, name: &str) -> usize {
        self.staging.lock().discard_split(name)
    }

    pub fn staged_len(&self) -> usize {
        self.staging.lock().len()
    }

    /// Lock the metadata and merge pending staged updates into it.
    ///
    /// The drain and the merge both happen while the metadata guard is
    /// held, so readers see a staged update either fully applied or not
    /// at all.
    pub fn consistent(&self) -> ConsistentView<'_> {
        let mut meta = self.metadata.lock();
        let updates = self.staging.lock().drain();
        if !updates.is_empty() {
            let applied = meta.merge(updates);
            trace!(applied, "staged updates merged");
        }
        meta
    }
}
