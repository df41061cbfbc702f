//! In-memory caches in front of object storage.
//!
//! - `LrfuCache`: long-lived result cache shared by every query
//! - `PrefetchCache`: per-query, single-use holding area for results the
//!   background workers fetched ahead of demand

mod arena;
pub mod lrfu;
pub mod prefetch;

pub use lrfu::LrfuCache;
pub use prefetch::PrefetchCache;
