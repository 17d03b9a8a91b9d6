//! Graph store trait definition.

use graphlode_model::Value;

use crate::error::StoreError;
use crate::types::{
    ColumnarRow, EdgeId, EdgeRecord, PropertyMap, StoreCapabilities, VertexId, VertexRecord,
};

/// A mutable property graph backend.
///
/// The trait is object-safe and synchronous; the import engine drives
/// it through `&mut dyn GraphStore`. Transaction methods default to
/// no-ops so in-memory backends need not implement them, and the bulk
/// primitives default to [`StoreError::Unsupported`] so only columnar
/// backends carry them.
pub trait GraphStore {
    /// Capability flags used for accumulator selection.
    fn capabilities(&self) -> StoreCapabilities;

    // Vertex CRUD

    /// Add a vertex. The uid is not checked for uniqueness; callers
    /// that require merge-on-duplicate go through
    /// [`vertex_by_uid`](Self::vertex_by_uid) first.
    fn add_vertex(
        &mut self,
        label: &str,
        uid: &str,
        properties: PropertyMap,
    ) -> Result<VertexId, StoreError>;

    /// Fetch a vertex by its backend id.
    fn vertex(&self, id: VertexId) -> Result<VertexRecord, StoreError>;

    /// Exact lookup by uid. With duplicate uids (possible mid-import
    /// in the columnar path) any one match is returned.
    fn vertex_by_uid(&self, uid: &str) -> Result<Option<VertexRecord>, StoreError>;

    /// All vertices with the given label.
    fn vertices_with_label(&self, label: &str) -> Result<Vec<VertexRecord>, StoreError>;

    /// Vertices with the given label carrying `value` under `key`.
    fn find_vertices(
        &self,
        label: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<VertexRecord>, StoreError>;

    /// Merge properties into an existing vertex, last write wins per key.
    fn merge_vertex_properties(
        &mut self,
        id: VertexId,
        properties: PropertyMap,
    ) -> Result<(), StoreError>;

    /// Remove a vertex and all of its edges.
    fn remove_vertex(&mut self, id: VertexId) -> Result<(), StoreError>;

    // Edge CRUD

    fn add_edge(
        &mut self,
        label: &str,
        source: VertexId,
        target: VertexId,
        properties: PropertyMap,
    ) -> Result<EdgeId, StoreError>;

    fn out_edges(&self, id: VertexId) -> Result<Vec<EdgeRecord>, StoreError>;

    fn in_edges(&self, id: VertexId) -> Result<Vec<EdgeRecord>, StoreError>;

    // Introspection

    /// Distinct vertex labels, sorted.
    fn labels(&self) -> Result<Vec<String>, StoreError>;

    fn vertex_count(&self) -> Result<usize, StoreError>;

    fn edge_count(&self) -> Result<usize, StoreError>;

    // Transactions (no-ops unless `capabilities().transactions`)

    fn begin(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Re-arm any store-specific bulk mode after a commit.
    fn start_batch(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    // Bulk-columnar primitives (only with `capabilities().bulk_columnar`)

    /// Insert a batch of uniform-schema vertices. Every row's values
    /// are positionally aligned with `columns`.
    fn stream_vertices(
        &mut self,
        _label: &str,
        _columns: &[String],
        _rows: Vec<ColumnarRow>,
    ) -> Result<usize, StoreError> {
        Err(StoreError::unsupported("stream_vertices"))
    }

    /// Create one edge per `(source_uid, target_uid)` pair by joining
    /// both endpoints on the uid column, restricted to the given
    /// labels. Pairs whose endpoints do not both exist produce no
    /// edge and no error; repeated pairs in one call and edges that
    /// already exist create nothing. Returns the number of edges
    /// created.
    fn bulk_add_edges(
        &mut self,
        _edge_label: &str,
        _source_label: &str,
        _target_label: &str,
        _pairs: &[(String, String)],
        _properties: &PropertyMap,
    ) -> Result<usize, StoreError> {
        Err(StoreError::unsupported("bulk_add_edges"))
    }

    /// Merge vertices of one label that share a uid into a single
    /// vertex (last write wins per property key). Returns the number
    /// of vertices removed.
    fn collapse_duplicate_vertices(&mut self, _label: &str) -> Result<usize, StoreError> {
        Err(StoreError::unsupported("collapse_duplicate_vertices"))
    }
}
