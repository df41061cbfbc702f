//! Graph access engine.
//!
//! Answers neighbour requests through a waterfall of progressively more
//! expensive sources:
//!
//! 1. the shared LRFU result cache, keyed by `(node, label, direction)`
//! 2. the query's prefetch cache (full edge lists, consumed on read)
//! 3. a background fetch for the node that is already running
//! 4. a range read of exactly the requested slice from storage
//!
//! Whatever the source, the result goes into the LRFU cache if absent and
//! its destinations are fed to the query's traversal queue, where the
//! prefetch workers pick them up.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::LrfuCache;
use crate::config::EngineConfig;
use crate::csr::{edges_from_bytes, filter_edges, Direction, Edge, ObjectDirectory, ObjectIndex};
use crate::error::{GraphError, Result};
use crate::prefetch::{Algorithm, EdgeFetcher, Prefetcher};
use crate::stats::{AccessStats, StatsSnapshot, Tier};
use crate::storage::{ByteRange, ObjectStore};

/// Identifies an open query.
pub type QueryId = u64;

/// One neighbour lookup. Also the result cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NeighbourRequest {
    pub node: u32,
    pub label: u32,
    pub direction: Direction,
}

impl NeighbourRequest {
    pub fn new(node: u32, label: u32, direction: Direction) -> Self {
        Self { node, label, direction }
    }
}

// ── Storage reads ──────────────────────────────────────────────────

fn read_edges(store: &dyn ObjectStore, index: &ObjectIndex, range: Option<ByteRange>) -> Result<Vec<Edge>> {
    match range {
        // Empty run: nothing to fetch.
        None => Ok(Vec::new()),
        Some(range) => edges_from_bytes(&store.fetch(&index.descriptor().object_name, range)?),
    }
}

/// Every edge of `node`, as the prefetch workers load it.
fn fetch_all_edges(store: &dyn ObjectStore, directory: &ObjectDirectory, node: u32) -> Result<Vec<Edge>> {
    let index = directory.find(node)?;
    read_edges(store, index, index.all_edges(node)?.range)
}

// ── GraphAccessEngine ──────────────────────────────────────────────

pub struct GraphAccessEngine {
    store: Arc<dyn ObjectStore>,
    directory: Arc<ObjectDirectory>,
    config: EngineConfig,
    cache: LrfuCache<NeighbourRequest, Vec<u32>>,
    queries: RwLock<HashMap<QueryId, Arc<Prefetcher>>>,
    next_query: AtomicU64,
    stats: AccessStats,
}

impl GraphAccessEngine {
    /// Load the index of every object in `store` and build the engine.
    pub fn open(store: Arc<dyn ObjectStore>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let directory = ObjectDirectory::load(store.as_ref(), config.index_layout)?;
        let cache = LrfuCache::new(config.lrfu_capacity, config.lrfu_lambda)?;
        info!(
            objects = directory.len(),
            lrfu_capacity = config.lrfu_capacity,
            lrfu_lambda = config.lrfu_lambda,
            workers = config.prefetch_workers,
            "graph access engine ready"
        );
        Ok(Self {
            store,
            directory: Arc::new(directory),
            config,
            cache,
            queries: RwLock::new(HashMap::new()),
            next_query: AtomicU64::new(1),
            stats: AccessStats::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn directory(&self) -> &ObjectDirectory {
        &self.directory
    }

    // ── Query lifecycle ────────────────────────────────────────────

    /// Open a query and start its prefetch workers.
    pub fn start_query(&self, algorithm: Algorithm) -> Result<QueryId> {
        let id = self.next_query.fetch_add(1, Ordering::Relaxed);

        let store = Arc::clone(&self.store);
        let directory = Arc::clone(&self.directory);
        let fetch: EdgeFetcher = Arc::new(move |node| fetch_all_edges(store.as_ref(), &directory, node));

        let prefetcher = Prefetcher::start(id, algorithm, &self.config, fetch)?;
        self.queries.write().insert(id, Arc::new(prefetcher));
        info!(query = id, algorithm = algorithm.as_str(), "query started");
        Ok(id)
    }

    /// Stop a query's workers and drop its prefetch state.
    pub fn end_query(&self, id: QueryId) -> Result<()> {
        let prefetcher = self.queries.write().remove(&id).ok_or(GraphError::QueryNotFound(id))?;
        prefetcher.stop();
        info!(query = id, "query ended");
        Ok(())
    }

    pub fn active_queries(&self) -> usize {
        self.queries.read().len()
    }

    pub(crate) fn prefetcher(&self, id: QueryId) -> Result<Arc<Prefetcher>> {
        self.queries.read().get(&id).cloned().ok_or(GraphError::QueryNotFound(id))
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // ── Requests ───────────────────────────────────────────────────

    /// Destinations of `request.node`'s edges with `request.label` in
    /// `request.direction`. Outgoing matches come first for `Both`.
    pub fn get_neighbours(&self, request: NeighbourRequest, query: QueryId) -> Result<Vec<u32>> {
        let prefetcher = self.prefetcher(query)?;
        if !self.config.index_layout.supports(request.direction) {
            return Err(GraphError::UnsupportedDirection(request.direction));
        }

        let (neighbours, tier) = self.resolve(&request, &prefetcher)?;
        self.stats.record(tier);
        debug!(
            query,
            node = request.node,
            label = request.label,
            direction = ?request.direction,
            tier = tier.as_str(),
            count = neighbours.len(),
            "neighbours resolved"
        );

        if !self.cache.present(&request) {
            self.cache.put(request, neighbours.clone());
        }
        prefetcher.write(&neighbours);
        Ok(neighbours)
    }

    fn resolve(&self, request: &NeighbourRequest, prefetcher: &Prefetcher) -> Result<(Vec<u32>, Tier)> {
        if let Some(hit) = self.cache.get(request) {
            return Ok((hit, Tier::Cache));
        }

        if let Some(edges) = prefetcher.get_from_prefetch_cache(request.node) {
            return Ok((self.filter(request, &edges)?, Tier::Prefetcher));
        }

        if let Some(outcome) = prefetcher.wait_in_flight(request.node) {
            match outcome {
                Ok(edges) => return Ok((self.filter(request, &edges)?, Tier::InFlight)),
                Err(e) => debug!(node = request.node, error = %e, "in-flight fetch failed, reading directly"),
            }
        }

        Ok((self.fetch_remote(request)?, Tier::Remote))
    }

    /// Filter a node's full edge list for `request`.
    fn filter(&self, request: &NeighbourRequest, edges: &[Edge]) -> Result<Vec<u32>> {
        let index = self.directory.find(request.node)?;
        let outgoing_len = index.all_edges(request.node)?.outgoing_len;
        Ok(filter_edges(edges, outgoing_len, request.label, request.direction))
    }

    /// Cold path: read only the slice the request needs.
    fn fetch_remote(&self, request: &NeighbourRequest) -> Result<Vec<u32>> {
        let index = self.directory.find(request.node)?;
        let slice = index.slice_for(request.node, request.direction)?;
        let edges = read_edges(self.store.as_ref(), index, slice.range)?;
        Ok(filter_edges(&edges, slice.outgoing_len, request.label, request.direction))
    }
}
