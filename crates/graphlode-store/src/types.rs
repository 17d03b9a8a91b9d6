//! Shared store types.

use std::collections::BTreeMap;

use graphlode_model::ValueList;

/// Backend-assigned vertex identifier. Stable while the vertex exists;
/// holding an id across a removal is a caller bug.
pub type VertexId = u64;

/// Backend-assigned edge identifier.
pub type EdgeId = u64;

/// Vertex/edge property storage: list-valued, deterministically ordered.
pub type PropertyMap = BTreeMap<String, ValueList>;

/// A materialized vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexRecord {
    pub id: VertexId,
    pub label: String,
    /// Caller-composed unique identifier (raw id plus partition).
    pub uid: String,
    pub properties: PropertyMap,
}

/// A materialized edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub label: String,
    pub source: VertexId,
    pub target: VertexId,
    pub properties: PropertyMap,
}

/// What a backend can do beyond plain vertex/edge CRUD. The import
/// engine selects its accumulation strategy from these flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapabilities {
    /// Exact vertex lookup by uid without a client-side map.
    pub keyed_lookup: bool,
    /// Uniform-schema streaming inserts and join-based bulk edges.
    pub bulk_columnar: bool,
    /// Explicit begin/commit/rollback.
    pub transactions: bool,
}

/// One row of a uniform-schema vertex batch. `values` is positionally
/// aligned with the column list passed to
/// [`stream_vertices`](crate::GraphStore::stream_vertices); `None`
/// marks a padded (absent) column.
#[derive(Debug, Clone)]
pub struct ColumnarRow {
    pub uid: String,
    pub values: Vec<Option<ValueList>>,
}
