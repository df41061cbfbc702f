//! Engine tuning parameters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::csr::IndexLayout;
use crate::error::{GraphError, Result};

// ── Defaults ───────────────────────────────────────────────────────

pub const DEFAULT_LRFU_CAPACITY: usize = 1000;
pub const DEFAULT_LRFU_LAMBDA: f64 = 0.2;
pub const DEFAULT_PREFETCH_WORKERS: usize = 5;
pub const DEFAULT_PREFETCH_CACHE_CAPACITY: usize = 100;
pub const DEFAULT_TRAVERSAL_QUEUE_CAPACITY: usize = 100;

// ── Engine Config ──────────────────────────────────────────────────

/// Sizes of the caches and worker pools, plus the index layout every
/// object in the store shares.
///
/// Deserializes from JSON with every field optional:
///
/// ```json
/// { "lrfu_capacity": 5000, "prefetch_workers": 8, "index_layout": "outgoing_only" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Entries in the shared result cache.
    pub lrfu_capacity: usize,
    /// Recency weight of the result cache, in `[0, 1]`.
    pub lrfu_lambda: f64,
    /// Background fetch threads per query.
    pub prefetch_workers: usize,
    /// Entries in each query's prefetch cache.
    pub prefetch_cache_capacity: usize,
    /// Slots in each query's traversal queue.
    pub traversal_queue_capacity: usize,
    pub index_layout: IndexLayout,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lrfu_capacity: DEFAULT_LRFU_CAPACITY,
            lrfu_lambda: DEFAULT_LRFU_LAMBDA,
            prefetch_workers: DEFAULT_PREFETCH_WORKERS,
            prefetch_cache_capacity: DEFAULT_PREFETCH_CACHE_CAPACITY,
            traversal_queue_capacity: DEFAULT_TRAVERSAL_QUEUE_CAPACITY,
            index_layout: IndexLayout::default(),
        }
    }
}

impl EngineConfig {
    /// Load a JSON config file.
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("lrfu_capacity", self.lrfu_capacity),
            ("prefetch_workers", self.prefetch_workers),
            ("prefetch_cache_capacity", self.prefetch_cache_capacity),
            ("traversal_queue_capacity", self.traversal_queue_capacity),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(GraphError::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        if !(0.0..=1.0).contains(&self.lrfu_lambda) {
            return Err(GraphError::InvalidConfig(format!(
                "lrfu_lambda must be within [0, 1], got {}",
                self.lrfu_lambda
            )));
        }
        Ok(())
    }
}
