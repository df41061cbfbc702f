//! Traversal-aware prefetching.
//!
//! Results a query returns are fed back as the next nodes it is likely to
//! ask for. A per-query pool of workers fetches them in the background, so
//! by the time the query gets there the edges are either in the prefetch
//! cache or already on their way.

pub mod future;
pub mod prefetcher;
pub mod queue;

pub use future::Future;
pub use prefetcher::{EdgeFetcher, FetchOutcome, Prefetcher};
pub use queue::{Algorithm, TraversalQueue};
