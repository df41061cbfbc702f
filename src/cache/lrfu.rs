//! Least Recently/Frequently Used result cache.
//!
//! Every entry carries a combined recency/frequency score that decays with
//! a logical clock:
//!
//! ```text
//! base        = 0.5 ^ lambda
//! decay(dt)   = base ^ dt
//! on access:    score = decay(0) + decay(now - last) * score
//! ```
//!
//! `lambda = 1` weights only recency (LRU), `lambda = 0` only frequency
//! (LFU). Entries live in a binary min-heap ordered by the decayed score,
//! so the eviction victim is always the root. All entries decay by the same
//! factor per tick, which keeps the heap ordered between accesses.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::error::{GraphError, Result};

struct Entry<K, V> {
    key: K,
    value: V,
    last_access: u64,
    score: f64,
}

struct Heap<K, V> {
    entries: Vec<Entry<K, V>>,
    /// Key -> position in `entries`.
    positions: HashMap<K, usize>,
    time: u64,
    base: f64,
}

impl<K: Hash + Eq + Clone, V> Heap<K, V> {
    fn decay(&self, dt: u64) -> f64 {
        self.base.powf(dt as f64)
    }

    fn decayed(&self, i: usize) -> f64 {
        let e = &self.entries[i];
        e.score * self.decay(self.time - e.last_access)
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.decayed(a) < self.decayed(b)
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        self.positions.insert(self.entries[a].key.clone(), a);
        self.positions.insert(self.entries[b].key.clone(), b);
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.less(i, parent) {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.entries.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut smallest = i;
            if left < n && self.less(left, smallest) {
                smallest = left;
            }
            if right < n && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.swap(i, smallest);
            i = smallest;
        }
    }

    /// Record an access to the entry at `i` and restore heap order.
    fn touch(&mut self, i: usize) {
        let now = self.time;
        let factor = self.decay(now - self.entries[i].last_access);
        let entry = &mut self.entries[i];
        entry.score = 1.0 + factor * entry.score;
        entry.last_access = now;
        self.sift_down(i);
    }
}

/// Bounded cache evicting the entry with the lowest decayed score.
pub struct LrfuCache<K, V> {
    capacity: usize,
    lambda: f64,
    heap: Mutex<Heap<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> LrfuCache<K, V> {
    pub fn new(capacity: usize, lambda: f64) -> Result<Self> {
        if capacity == 0 {
            return Err(GraphError::InvalidConfig("LRFU capacity must be positive".into()));
        }
        if !(0.0..=1.0).contains(&lambda) {
            return Err(GraphError::InvalidConfig(format!(
                "LRFU lambda must be within [0, 1], got {}",
                lambda
            )));
        }
        Ok(Self {
            capacity,
            lambda,
            heap: Mutex::new(Heap {
                entries: Vec::with_capacity(capacity),
                positions: HashMap::with_capacity(capacity),
                time: 0,
                base: 0.5f64.powf(lambda),
            }),
        })
    }

    /// Insert `key`. When full, the lowest-scored entry is replaced and its
    /// key returned. Putting a cached key replaces its value and counts as
    /// an access.
    pub fn put(&self, key: K, value: V) -> Option<K> {
        let mut heap = self.heap.lock();
        heap.time += 1;

        if let Some(&i) = heap.positions.get(&key) {
            heap.entries[i].value = value;
            heap.touch(i);
            return None;
        }

        let entry = Entry {
            key: key.clone(),
            value,
            last_access: heap.time,
            score: 1.0,
        };

        if heap.entries.len() >= self.capacity {
            let victim = std::mem::replace(&mut heap.entries[0], entry);
            heap.positions.remove(&victim.key);
            heap.positions.insert(key, 0);
            heap.sift_down(0);
            Some(victim.key)
        } else {
            heap.entries.push(entry);
            let i = heap.entries.len() - 1;
            heap.positions.insert(key, i);
            heap.sift_up(i);
            None
        }
    }

    /// Look up `key`, recording the access on a hit.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut heap = self.heap.lock();
        heap.time += 1;
        let i = *heap.positions.get(key)?;
        let value = heap.entries[i].value.clone();
        heap.touch(i);
        Some(value)
    }

    /// Membership test; does not count as an access.
    pub fn present(&self, key: &K) -> bool {
        self.heap.lock().positions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.heap.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// put 1, put 2, get 1 twice, get 2, then put 3 into a full cache.
    fn run_sequence(lambda: f64) -> (LrfuCache<u32, u32>, Option<u32>) {
        let cache = LrfuCache::new(2, lambda).unwrap();
        cache.put(1, 101);
        cache.put(2, 102);
        cache.get(&1);
        cache.get(&1);
        cache.get(&2);
        let evicted = cache.put(3, 103);
        (cache, evicted)
    }

    #[test]
    fn test_lambda_one_behaves_like_lru() {
        let (cache, evicted) = run_sequence(1.0);
        assert_eq!(evicted, Some(1));
        assert!(!cache.present(&1));
        assert_eq!(cache.get(&2), Some(102));
    }

    #[test]
    fn test_lambda_zero_behaves_like_lfu() {
        let (cache, evicted) = run_sequence(0.0);
        assert_eq!(evicted, Some(2));
        assert_eq!(cache.get(&1), Some(101));
        assert!(cache.get(&2).is_none());
    }

    #[test]
    fn test_intermediate_lambdas() {
        // Frequency still wins at 0.4.
        let (cache, _) = run_sequence(0.4);
        assert!(cache.present(&1));
        assert!(!cache.present(&2));

        // Recency wins at 0.6.
        let (cache, _) = run_sequence(0.6);
        assert!(!cache.present(&1));
        assert!(cache.present(&2));
    }

    #[test]
    fn test_put_existing_key_updates_value() {
        let cache = LrfuCache::new(2, 0.5).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.put("a", 10), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(10));
        // "b" has the weakest score now.
        assert_eq!(cache.put("c", 3), Some("b"));
    }

    #[test]
    fn test_miss_does_not_insert() {
        let cache: LrfuCache<u32, u32> = LrfuCache::new(4, 0.2).unwrap();
        assert_eq!(cache.get(&9), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(LrfuCache::<u32, u32>::new(0, 0.5).is_err());
        assert!(LrfuCache::<u32, u32>::new(4, 1.5).is_err());
        assert!(LrfuCache::<u32, u32>::new(4, -0.1).is_err());
        assert!(LrfuCache::<u32, u32>::new(4, f64::NAN).is_err());
    }

    proptest! {
        #[test]
        fn prop_bounded_and_keeps_newest(
            capacity in 1usize..16,
            lambda in 0.0f64..=1.0,
            ops in prop::collection::vec((any::<bool>(), 0u32..32), 1..200),
        ) {
            let cache = LrfuCache::new(capacity, lambda).unwrap();
            for (is_put, key) in ops {
                if is_put {
                    cache.put(key, key * 10);
                    prop_assert!(cache.present(&key));
                } else if let Some(v) = cache.get(&key) {
                    prop_assert_eq!(v, key * 10);
                }
                prop_assert!(cache.len() <= capacity);
            }
        }
    }
}
