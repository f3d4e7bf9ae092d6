//! splitgrid-scheduler — worker-local task placement.
//!
//! Decides which executor process on this worker runs each task, using
//! where the task's splits already live and how loaded each executor is,
//! and keeps every task of a lineage on the executor its first task got.
//!
//! # Architecture
//!
//! ```text
//! TaskScheduler
//!   ├── LineageAffinity (per-lineage slot locks, first decision wins)
//!   ├── MetadataGuard
//!   │   ├── Metadata: SplitRegistry + ExecutorLoadTable (one lock)
//!   │   └── StagingBuffer (own lock, merged lazily on read)
//!   └── SharedArrays (worker-owned set, injected)
//! ```
//!
//! Lock order is documented in [`guard`].

pub mod affinity;
pub mod error;
pub mod guard;
pub mod scheduler;
pub mod shared_arrays;

pub use affinity::{LineageAffinity, Resolution};
pub use error::{SchedulerError, SchedulerResult};
pub use guard::{ConsistentView, MetadataGuard};
pub use scheduler::{CompletionOutcome, TaskCompletion, TaskScheduler, TaskStatus};
pub use shared_arrays::SharedArrays;
pub use splitgrid_placement::{Selection, TieBreakKey, Validation};
