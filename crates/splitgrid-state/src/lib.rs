//! splitgrid-state — volatile scheduling state for a SplitGrid worker.
//!
//! Holds the worker's view of where splits live and how loaded each
//! executor is. Nothing here is durable: the registry can always be
//! rebuilt from the data layer, so every structure is a plain in-memory
//! map without interior locking. Callers wrap them in the guards they
//! need (see `splitgrid-scheduler`).
//!
//! # Architecture
//!
//! ```text
//! Metadata (one guard)
//!   ├── SplitRegistry      split name → size + holder executors
//!   └── ExecutorLoadTable  executor id → persist/exec load, mem used
//! StagingBuffer (own guard)
//!   └── (split, executor) → size, folded into the registry on merge
//! ```

pub mod error;
pub mod load;
pub mod metadata;
pub mod registry;
pub mod staging;
pub mod types;

pub use error::{StateError, StateResult};
pub use load::ExecutorLoadTable;
pub use metadata::Metadata;
pub use registry::SplitRegistry;
pub use staging::StagingBuffer;
pub use types::*;
