//! Bounded traversal queue.
//!
//! Node ids discovered by queries wait here until a prefetch worker picks
//! them up. The overflow policy follows the traversal order of the query:
//!
//! - **BFS**: FIFO. A full queue drops new arrivals, because the nodes
//!   already queued are the ones the traversal reaches first.
//! - **DFS**: LIFO. A full queue overwrites its oldest entry, because the
//!   traversal goes deeper along the newest branch.

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Traversal order a query declares when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Bfs,
    Dfs,
}

impl Algorithm {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bfs" => Some(Algorithm::Bfs),
            "dfs" => Some(Algorithm::Dfs),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Bfs => "bfs",
            Algorithm::Dfs => "dfs",
        }
    }
}

// ── Ring buffer ────────────────────────────────────────────────────

struct Ring {
    slots: Vec<u32>,
    front: usize,
    back: usize,
    full: bool,
    deleted: bool,
}

impl Ring {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else {
            (self.back + self.capacity() - self.front) % self.capacity()
        }
    }

    fn is_empty(&self) -> bool {
        !self.full && self.front == self.back
    }

    fn advance(&self, i: usize) -> usize {
        (i + 1) % self.capacity()
    }

    /// Append unless full. Returns whether the value was stored.
    fn push_or_drop(&mut self, value: u32) -> bool {
        if self.full {
            return false;
        }
        self.slots[self.back] = value;
        self.back = self.advance(self.back);
        self.full = self.back == self.front;
        true
    }

    /// Append, overwriting the front entry when full.
    fn push_or_overwrite(&mut self, value: u32) {
        self.slots[self.back] = value;
        self.back = self.advance(self.back);
        if self.full {
            self.front = self.advance(self.front);
        } else {
            self.full = self.back == self.front;
        }
    }

    fn pop_front(&mut self) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.front];
        self.front = self.advance(self.front);
        self.full = false;
        Some(value)
    }

    fn pop_back(&mut self) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        self.back = (self.back + self.capacity() - 1) % self.capacity();
        self.full = false;
        Some(self.slots[self.back])
    }
}

// ── TraversalQueue ─────────────────────────────────────────────────

/// Fixed-capacity queue of node ids shared by a query's writers and its
/// prefetch workers.
pub struct TraversalQueue {
    algorithm: Algorithm,
    ring: Mutex<Ring>,
    available: Condvar,
}

impl TraversalQueue {
    pub fn new(capacity: usize, algorithm: Algorithm) -> Result<Self> {
        if capacity == 0 {
            return Err(GraphError::InvalidConfig(
                "traversal queue capacity must be positive".into(),
            ));
        }
        Ok(Self {
            algorithm,
            ring: Mutex::new(Ring {
                slots: vec![0; capacity],
                front: 0,
                back: 0,
                full: false,
                deleted: false,
            }),
            available: Condvar::new(),
        })
    }

    /// Queue a batch of node ids. Writes to a deleted queue are ignored.
    ///
    /// For DFS the batch is pushed in reverse so that its first element is
    /// read first.
    pub fn write_all(&self, nodes: &[u32]) {
        let mut ring = self.ring.lock();
        if ring.deleted {
            return;
        }
        match self.algorithm {
            Algorithm::Bfs => {
                for &node in nodes {
                    if !ring.push_or_drop(node) {
                        break;
                    }
                    self.available.notify_one();
                }
            }
            Algorithm::Dfs => {
                for &node in nodes.iter().rev() {
                    ring.push_or_overwrite(node);
                    self.available.notify_one();
                }
            }
        }
    }

    fn take(&self, ring: &mut Ring) -> Option<u32> {
        match self.algorithm {
            Algorithm::Bfs => ring.pop_front(),
            Algorithm::Dfs => ring.pop_back(),
        }
    }

    /// Block until a node id is available or the queue is deleted.
    pub fn read(&self) -> Result<u32> {
        let mut ring = self.ring.lock();
        loop {
            if ring.deleted {
                return Err(GraphError::QueueDeleted);
            }
            if let Some(node) = self.take(&mut ring) {
                return Ok(node);
            }
            self.available.wait(&mut ring);
        }
    }

    /// Non-blocking read.
    pub fn try_read(&self) -> Result<u32> {
        let mut ring = self.ring.lock();
        if ring.deleted {
            return Err(GraphError::QueueDeleted);
        }
        self.take(&mut ring).ok_or(GraphError::QueueEmpty)
    }

    /// Permanently close the queue and wake every blocked reader.
    pub fn delete(&self) {
        let mut ring = self.ring.lock();
        if !ring.deleted {
            ring.deleted = true;
            self.available.notify_all();
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.ring.lock().deleted
    }

    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}
