//! Single-use prefetch cache.
//!
//! Holds results fetched ahead of demand. A read consumes the entry: once a
//! query has pulled a node's edges out, the long-lived result cache owns
//! them. When full, the oldest insertion is evicted.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::cache::arena::ArenaList;
use crate::error::{GraphError, Result};

struct Inner<K, V> {
    order: ArenaList<(K, V)>,
    handles: HashMap<K, usize>,
}

/// Bounded FIFO store with consume-on-read semantics.
pub struct PrefetchCache<K, V> {
    capacity: usize,
    inner: Mutex<Inner<K, V>>,
}

impl<K: Hash + Eq + Copy, V> PrefetchCache<K, V> {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(GraphError::InvalidConfig(
                "prefetch cache capacity must be positive".into(),
            ));
        }
        Ok(Self {
            capacity,
            inner: Mutex::new(Inner {
                order: ArenaList::with_capacity(capacity),
                handles: HashMap::with_capacity(capacity),
            }),
        })
    }

    /// Insert at the newest end. An existing entry for `key` is replaced.
    pub fn put(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        if let Some(handle) = inner.handles.remove(&key) {
            inner.order.remove(handle);
        }
        if inner.order.len() >= self.capacity {
            if let Some((oldest, _)) = inner.order.pop_front() {
                inner.handles.remove(&oldest);
            }
        }
        let handle = inner.order.push_back((key, value));
        inner.handles.insert(key, handle);
    }

    /// Remove and return the entry for `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let handle = inner.handles.remove(key)?;
        inner.order.remove(handle).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
