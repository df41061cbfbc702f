//! Cache tier counters.
//!
//! One `AccessStats` lives inside each engine. Every answered request bumps
//! exactly one counter, naming the tier that produced the edges:
//!
//! - `cache_hits`: shared result cache
//! - `prefetcher_hits`: the query's prefetch cache
//! - `in_flight_hits`: a background fetch that was already running
//! - `remote_fetches`: a range read on the request path
//!
//! Counters are never reset; `snapshot()` copies them out for reporting.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::Result;

/// Which tier answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Cache,
    Prefetcher,
    InFlight,
    Remote,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Cache => "cache",
            Tier::Prefetcher => "prefetcher",
            Tier::InFlight => "in_flight",
            Tier::Remote => "remote",
        }
    }
}

#[derive(Debug, Default)]
pub struct AccessStats {
    cache_hits: AtomicU64,
    prefetcher_hits: AtomicU64,
    in_flight_hits: AtomicU64,
    remote_fetches: AtomicU64,
}

impl AccessStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, tier: Tier) {
        let counter = match tier {
            Tier::Cache => &self.cache_hits,
            Tier::Prefetcher => &self.prefetcher_hits,
            Tier::InFlight => &self.in_flight_hits,
            Tier::Remote => &self.remote_fetches,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            prefetcher_hits: self.prefetcher_hits.load(Ordering::Relaxed),
            in_flight_hits: self.in_flight_hits.load(Ordering::Relaxed),
            remote_fetches: self.remote_fetches.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters (for the GetStats response).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub prefetcher_hits: u64,
    pub in_flight_hits: u64,
    pub remote_fetches: u64,
}

impl StatsSnapshot {
    /// Requests answered so far.
    pub fn total(&self) -> u64 {
        self.cache_hits + self.prefetcher_hits + self.in_flight_hits + self.remote_fetches
    }

    /// Share of requests answered without a remote fetch on the request
    /// path. `0.0` before the first request.
    pub fn hit_ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => (total - self.remote_fetches) as f64 / total as f64,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
