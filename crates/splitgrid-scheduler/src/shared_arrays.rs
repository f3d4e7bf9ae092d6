//! Handle to the worker's shared-memory array set.
//!
//! The set and its lock belong to the worker; the scheduler only borrows
//! the capability. A name in the set is durably present at worker level.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
pub struct SharedArrays {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl SharedArrays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a set owned elsewhere.
    pub fn from_shared(inner: Arc<Mutex<HashSet<String>>>) -> Self {
        Self { inner }
    }

    pub fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.inner.lock()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().contains(name)
    }

    pub fn insert(&self, name: impl Into<String>) -> bool {
        self.inner.lock().insert(name.into())
    }
}
