//! One-shot value cell shared between a prefetch worker and the queries
//! waiting for the node it is fetching.

use parking_lot::{Condvar, Mutex};
use tracing::debug;

/// Written once by its producer, read by any number of consumers.
pub struct Future<T> {
    value: Mutex<Option<T>>,
    resolved: Condvar,
}

impl<T: Clone> Future<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            resolved: Condvar::new(),
        }
    }

    /// Resolve the cell and wake every waiter. Only the first call takes
    /// effect; returns whether this call did.
    pub fn put(&self, value: T) -> bool {
        let mut slot = self.value.lock();
        if slot.is_some() {
            debug!("future already resolved, ignoring second value");
            return false;
        }
        *slot = Some(value);
        self.resolved.notify_all();
        true
    }

    /// Block until resolved and return a copy of the value.
    pub fn get(&self) -> T {
        let mut slot = self.value.lock();
        loop {
            if let Some(value) = slot.as_ref() {
                return value.clone();
            }
            self.resolved.wait(&mut slot);
        }
    }

    pub fn try_get(&self) -> Option<T> {
        self.value.lock().clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.value.lock().is_some()
    }
}

impl<T: Clone> Default for Future<T> {
    fn default() -> Self {
        Self::new()
    }
}
