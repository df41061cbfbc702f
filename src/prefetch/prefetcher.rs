//! Per-query background fetch pool.
//!
//! Each query owns a traversal queue, a prefetch cache and a fixed set of
//! worker threads. Workers take node ids off the queue, fetch every edge of
//! the node from storage, and leave the result in the prefetch cache. While
//! a fetch is running its worker publishes `(node, future)` in its slot so a
//! query asking for the same node can wait on it instead of fetching again.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::PrefetchCache;
use crate::config::EngineConfig;
use crate::csr::Edge;
use crate::engine::QueryId;
use crate::error::{GraphError, Result};
use crate::prefetch::future::Future;
use crate::prefetch::queue::{Algorithm, TraversalQueue};

/// Loads every edge of a node, outgoing first.
pub type EdgeFetcher = Arc<dyn Fn(u32) -> Result<Vec<Edge>> + Send + Sync>;

/// What a worker publishes through its future. Errors are shared between
/// every waiter.
pub type FetchOutcome = std::result::Result<Arc<Vec<Edge>>, Arc<GraphError>>;

/// A fetch a worker is currently running.
struct InFlight {
    node: u32,
    future: Arc<Future<FetchOutcome>>,
}

/// State shared with the worker threads.
struct Shared {
    query: QueryId,
    queue: TraversalQueue,
    cache: PrefetchCache<u32, Arc<Vec<Edge>>>,
    slots: Vec<Mutex<Option<InFlight>>>,
    fetch: EdgeFetcher,
}

pub struct Prefetcher {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Prefetcher {
    /// Create the queue and cache and start the workers.
    pub fn start(query: QueryId, algorithm: Algorithm, config: &EngineConfig, fetch: EdgeFetcher) -> Result<Self> {
        let shared = Arc::new(Shared {
            query,
            queue: TraversalQueue::new(config.traversal_queue_capacity, algorithm)?,
            cache: PrefetchCache::new(config.prefetch_cache_capacity)?,
            slots: (0..config.prefetch_workers).map(|_| Mutex::new(None)).collect(),
            fetch,
        });

        let mut workers = Vec::with_capacity(config.prefetch_workers);
        for slot in 0..config.prefetch_workers {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("prefetch-{}-{}", query, slot))
                .spawn(move || run_worker(worker_shared, slot));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Release the workers already running.
                    shared.queue.delete();
                    return Err(GraphError::Io(e));
                }
            }
        }

        debug!(query, algorithm = algorithm.as_str(), workers = workers.len(), "prefetcher started");
        Ok(Self {
            shared,
            workers: Mutex::new(workers),
        })
    }

    pub fn query_id(&self) -> QueryId {
        self.shared.query
    }

    pub fn algorithm(&self) -> Algorithm {
        self.shared.queue.algorithm()
    }

    /// Queue nodes for background fetching.
    pub fn write(&self, nodes: &[u32]) {
        self.shared.queue.write_all(nodes);
    }

    /// Take a prefetched result out of the cache.
    pub fn get_from_prefetch_cache(&self, node: u32) -> Option<Arc<Vec<Edge>>> {
        self.shared.cache.get(&node)
    }

    /// Future of a running fetch for `node`, if any worker holds one.
    pub fn get_from_in_flight(&self, node: u32) -> Option<Arc<Future<FetchOutcome>>> {
        self.shared.slots.iter().find_map(|slot| {
            slot.lock()
                .as_ref()
                .filter(|in_flight| in_flight.node == node)
                .map(|in_flight| Arc::clone(&in_flight.future))
        })
    }

    /// Block on the running fetch of `node`. `None` when no worker holds one.
    pub fn wait_in_flight(&self, node: u32) -> Option<Result<Arc<Vec<Edge>>>> {
        let future = self.get_from_in_flight(node)?;
        Some(future.get().map_err(GraphError::Prefetch))
    }

    /// Entries waiting in the prefetch cache.
    pub fn cached(&self) -> usize {
        self.shared.cache.len()
    }

    /// Node ids waiting in the traversal queue.
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// Signal the workers to exit. Does not wait: a fetch already running
    /// completes in the background.
    pub fn stop(&self) {
        self.shared.queue.delete();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.queue.is_deleted()
    }

    /// Stop and wait for every worker to exit.
    pub fn join(&self) {
        self.stop();
        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!(query = self.shared.query, "prefetch worker panicked");
            }
        }
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(shared: Arc<Shared>, slot: usize) {
    while let Ok(node) = shared.queue.read() {
        let future = Arc::new(Future::new());
        *shared.slots[slot].lock() = Some(InFlight {
            node,
            future: Arc::clone(&future),
        });

        // No lock held across storage.
        let outcome: FetchOutcome = match (shared.fetch)(node) {
            Ok(edges) => Ok(Arc::new(edges)),
            Err(e) => {
                warn!(query = shared.query, node, error = %e, "prefetch failed");
                Err(Arc::new(e))
            }
        };

        let mut in_flight = shared.slots[slot].lock();
        // Commit before the slot is cleared so the node is never absent
        // from both the cache and the in-flight slots.
        if let Ok(edges) = &outcome {
            shared.cache.put(node, Arc::clone(edges));
        }
        future.put(outcome);
        *in_flight = None;
    }
    debug!(query = shared.query, slot, "prefetch worker exiting");
}
