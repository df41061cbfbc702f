//! In-memory object store for tests and benchmarks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::{GraphError, Result};
use crate::storage::{ByteRange, ObjectStore};

/// Objects held in a map. Counts fetches and can simulate remote latency
/// or an outage so callers can observe storage traffic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    latency: Option<Duration>,
    fetch_count: AtomicU64,
    failing: AtomicBool,
    fail_budget: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every `fetch`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, name: impl Into<String>, bytes: Vec<u8>) {
        self.objects.write().insert(name.into(), bytes);
    }

    /// Number of `fetch` calls so far, including failed ones.
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Make every subsequent fetch fail with an I/O error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail only the next `count` fetches.
    pub fn fail_next(&self, count: u64) {
        self.fail_budget.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
            || self
                .fail_budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok()
    }
}

impl ObjectStore for MemoryStore {
    fn list_objects(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.objects.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn fetch(&self, object: &str, range: ByteRange) -> Result<Vec<u8>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        if self.take_failure() {
            return Err(GraphError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "simulated storage outage",
            )));
        }

        let objects = self.objects.read();
        let bytes = objects
            .get(object)
            .ok_or_else(|| GraphError::ObjectNotFound(object.to_string()))?;
        let (start, end) = range.resolve(object, bytes.len() as u64)?;
        Ok(bytes[start as usize..end as usize].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_fetches() {
        let store = MemoryStore::new();
        store.insert("a", vec![1, 2, 3, 4]);
        assert_eq!(store.fetch("a", ByteRange::inclusive(1, 2)).unwrap(), vec![2, 3]);
        assert!(store.fetch("b", ByteRange::to_end(0)).is_err());
        assert_eq!(store.fetch_count(), 2);
    }

    #[test]
    fn test_simulated_outage() {
        let store = MemoryStore::new();
        store.insert("a", vec![1]);
        store.set_failing(true);
        assert!(matches!(store.fetch("a", ByteRange::to_end(0)), Err(GraphError::Io(_))));
        store.set_failing(false);
        assert_eq!(store.fetch("a", ByteRange::to_end(0)).unwrap(), vec![1]);

        store.fail_next(2);
        assert!(store.fetch("a", ByteRange::to_end(0)).is_err());
        assert!(store.fetch("a", ByteRange::to_end(0)).is_err());
        assert!(store.fetch("a", ByteRange::to_end(0)).is_ok());
    }
}
