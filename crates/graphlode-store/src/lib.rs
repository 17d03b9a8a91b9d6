//! Graphlode Store - Property graph backends
//!
//! Defines the [`GraphStore`] trait driven by the import/export engine
//! and two backends:
//!
//! - [`MemoryStore`]: petgraph `StableGraph` with a uid index; exact
//!   keyed lookup, no transactions.
//! - [`SqliteStore`]: single SQLite database with JSON property
//!   columns; transactions, uniform-schema streaming inserts, and
//!   join-based bulk edge creation.
//!
//! Backends advertise what they can do via [`StoreCapabilities`]; the
//! engine picks its accumulation strategy from those flags rather than
//! from concrete types.

mod error;
mod memory;
mod schema;
mod sqlite;
mod traits;
mod types;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use schema::STORE_SCHEMA_VERSION;
pub use sqlite::SqliteStore;
pub use traits::GraphStore;
pub use types::{
    ColumnarRow, EdgeId, EdgeRecord, PropertyMap, StoreCapabilities, VertexId, VertexRecord,
};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
