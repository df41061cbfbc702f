//! Range-addressable object storage

pub mod local;
pub mod memory;

use std::fmt;

pub use local::LocalStore;
pub use memory::MemoryStore;

use crate::error::{GraphError, Result};

/// Byte range of a fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `[start, end]`, both ends inclusive.
    Inclusive { start: u64, end: u64 },
    /// `[start, end of object)`.
    From { start: u64 },
}

impl ByteRange {
    pub fn inclusive(start: u64, end: u64) -> Self {
        ByteRange::Inclusive { start, end }
    }

    pub fn to_end(start: u64) -> Self {
        ByteRange::From { start }
    }

    /// Half-open `[start, end)`; `None` when the range is empty.
    pub fn half_open(start: u64, end: u64) -> Option<Self> {
        if end > start {
            Some(ByteRange::Inclusive { start, end: end - 1 })
        } else {
            None
        }
    }

    pub fn start(&self) -> u64 {
        match *self {
            ByteRange::Inclusive { start, .. } | ByteRange::From { start } => start,
        }
    }

    /// Resolve against an object of `object_len` bytes into `[start, end)`.
    pub fn resolve(&self, object: &str, object_len: u64) -> Result<(u64, u64)> {
        let invalid = |reason: String| GraphError::InvalidRange {
            object: object.to_string(),
            reason,
        };
        match *self {
            ByteRange::Inclusive { start, end } => {
                if end < start {
                    return Err(invalid(format!("end {} before start {}", end, start)));
                }
                if end >= object_len {
                    return Err(invalid(format!("end {} past object length {}", end, object_len)));
                }
                Ok((start, end + 1))
            }
            ByteRange::From { start } => {
                if start > object_len {
                    return Err(invalid(format!("start {} past object length {}", start, object_len)));
                }
                Ok((start, object_len))
            }
        }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteRange::Inclusive { start, end } => write!(f, "bytes={}-{}", start, end),
            ByteRange::From { start } => write!(f, "bytes={}-", start),
        }
    }
}

/// Storage backend holding the graph objects.
///
/// Send + Sync required: one store is shared by every request thread and
/// every prefetch worker.
pub trait ObjectStore: Send + Sync {
    /// Names of all objects, in no particular order.
    fn list_objects(&self) -> Result<Vec<String>>;

    /// Read a byte range of one object.
    fn fetch(&self, object: &str, range: ByteRange) -> Result<Vec<u8>>;
}
