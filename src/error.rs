//! Error types for the graph access service

use std::sync::Arc;

use thiserror::Error;

use crate::csr::Direction;
use crate::engine::QueryId;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid buffer size: expected {expected}, got {actual} bytes")]
    InvalidSize { expected: String, actual: usize },

    #[error("Node not found: {0}")]
    NodeNotFound(u32),

    #[error("Queue is empty")]
    QueueEmpty,

    #[error("Queue has been deleted")]
    QueueDeleted,

    #[error("Direction {0:?} is not supported by the outgoing-only index layout")]
    UnsupportedDirection(Direction),

    #[error("Query not found: {0}")]
    QueryNotFound(QueryId),

    #[error("Invalid byte range for '{object}': {reason}")]
    InvalidRange { object: String, reason: String },

    #[error("Invalid object format: {0}")]
    InvalidFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A failure shared between a prefetch worker and every query waiting on
    /// its in-flight future.
    #[error("Prefetch failed: {0}")]
    Prefetch(Arc<GraphError>),
}

impl GraphError {
    /// Get error code for wire protocol
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::InvalidSize { .. } => "INVALID_SIZE",
            GraphError::NodeNotFound(_) => "NODE_NOT_FOUND",
            GraphError::QueueEmpty => "QUEUE_EMPTY",
            GraphError::QueueDeleted => "QUEUE_DELETED",
            GraphError::UnsupportedDirection(_) => "UNSUPPORTED_DIRECTION",
            GraphError::QueryNotFound(_) => "QUERY_NOT_FOUND",
            GraphError::InvalidRange { .. } => "INVALID_RANGE",
            GraphError::InvalidFormat(_) => "INVALID_FORMAT",
            GraphError::InvalidConfig(_) => "INVALID_CONFIG",
            GraphError::ObjectNotFound(_) => "OBJECT_NOT_FOUND",
            GraphError::Io(_) => "IO_ERROR",
            GraphError::Prefetch(inner) => inner.code(),
            GraphError::Json(_) => "INTERNAL_ERROR",
        }
    }

    pub(crate) fn invalid_size(expected: impl Into<String>, actual: usize) -> Self {
        GraphError::InvalidSize {
            expected: expected.into(),
            actual,
        }
    }
}
