//! SplitGrid placement engine — picks the executor a task should run on.
//!
//! All functions here are pure over a borrowed [`Metadata`]: the caller
//! holds whatever guard protects it, and the same metadata plus the same
//! inputs always yield the same decision.
//!
//! # Components
//!
//! - **`scorer`** — per-executor locality and load scores, ranking
//! - **`placer`** — executor selection and the deterministic tie-break
//! - **`validate`** — whether a task's splits are resident at a target
//!
//! [`Metadata`]: splitgrid_state::Metadata

pub mod placer;
pub mod scorer;
pub mod validate;

pub use placer::{Selection, TieBreakKey, deterministic_executor, select_executor, stable_hash};
pub use scorer::{ExecutorScore, rank_executors, score_executor};
pub use validate::{Validation, validate_partitions};
