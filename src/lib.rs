//! Graph access service
//!
//! Answers "which nodes are adjacent to N via label L?" against a graph
//! whose edges are partitioned across immutable, range-addressable objects.
//! Remote reads are slow, so requests go through a result cache, a
//! per-query prefetch cache and a de-duplication layer for fetches already
//! running before anything touches storage.
//!
//! Module map, leaf to root:
//!
//! - [`codec`]: little-endian integer decoding
//! - [`storage`]: `ObjectStore` trait, local directory and in-memory stores
//! - [`csr`]: object layout, index directory, label filtering, writer
//! - [`cache`]: LRFU result cache and single-use prefetch cache
//! - [`prefetch`]: traversal queue, futures, per-query worker pool
//! - [`engine`]: the request waterfall and query registry
//! - [`session`]: per-connection query ownership for the server

pub mod cache;
pub mod codec;
pub mod config;
pub mod csr;
pub mod engine;
pub mod error;
pub mod prefetch;
pub mod session;
pub mod stats;
pub mod storage;

pub use config::EngineConfig;
pub use csr::{Direction, Edge, IndexLayout};
pub use engine::{GraphAccessEngine, NeighbourRequest, QueryId};
pub use error::{GraphError, Result};
pub use prefetch::Algorithm;
pub use stats::StatsSnapshot;
pub use storage::{ByteRange, LocalStore, MemoryStore, ObjectStore};
