//! Store error types.

use thiserror::Error;

use crate::types::{EdgeId, VertexId};

/// Errors raised by a [`GraphStore`](crate::GraphStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Vertex id does not exist (stale id or removed vertex)
    #[error("vertex {0} not found")]
    VertexNotFound(VertexId),

    /// Edge id does not exist
    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    /// Optional bulk primitive not implemented by this backend
    #[error("operation '{0}' is not supported by this store")]
    Unsupported(&'static str),

    /// No transaction is open
    #[error("no open transaction")]
    NoTransaction,

    /// Underlying SQLite failure
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Property map could not be (de)serialized
    #[error("property serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Shorthand for the default bulk-primitive implementations.
    pub fn unsupported(operation: &'static str) -> Self {
        StoreError::Unsupported(operation)
    }
}
