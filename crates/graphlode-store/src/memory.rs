//! In-memory store backed by petgraph.
//!
//! `MemoryStore` keeps the whole graph in a `StableGraph` plus a
//! uid-to-index map, so it supports exact keyed lookup but no
//! transactions and no columnar bulk path.

use std::collections::{BTreeSet, HashMap};

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use graphlode_model::Value;

use crate::error::StoreError;
use crate::traits::GraphStore;
use crate::types::{
    EdgeId, EdgeRecord, PropertyMap, StoreCapabilities, VertexId, VertexRecord,
};

#[derive(Debug, Clone)]
struct VertexData {
    label: String,
    uid: String,
    properties: PropertyMap,
}

#[derive(Debug, Clone)]
struct EdgeData {
    label: String,
    properties: PropertyMap,
}

/// Petgraph-backed graph store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    graph: StableGraph<VertexData, EdgeData>,
    uid_index: HashMap<String, NodeIndex>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn node_index(&self, id: VertexId) -> Result<NodeIndex, StoreError> {
        let index = NodeIndex::new(id as usize);
        if self.graph.node_weight(index).is_some() {
            Ok(index)
        } else {
            Err(StoreError::VertexNotFound(id))
        }
    }

    fn record(&self, index: NodeIndex) -> VertexRecord {
        let data = &self.graph[index];
        VertexRecord {
            id: index.index() as VertexId,
            label: data.label.clone(),
            uid: data.uid.clone(),
            properties: data.properties.clone(),
        }
    }

    fn edge_record(&self, index: EdgeIndex) -> Option<EdgeRecord> {
        let (source, target) = self.graph.edge_endpoints(index)?;
        let data = self.graph.edge_weight(index)?;
        Some(EdgeRecord {
            id: index.index() as EdgeId,
            label: data.label.clone(),
            source: source.index() as VertexId,
            target: target.index() as VertexId,
            properties: data.properties.clone(),
        })
    }

    fn edges_directed(
        &self,
        id: VertexId,
        direction: Direction,
    ) -> Result<Vec<EdgeRecord>, StoreError> {
        let index = self.node_index(id)?;
        let mut edges: Vec<EdgeRecord> = self
            .graph
            .edges_directed(index, direction)
            .filter_map(|edge| self.edge_record(edge.id()))
            .collect();
        edges.sort_by_key(|e| e.id);
        Ok(edges)
    }
}

impl GraphStore for MemoryStore {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            keyed_lookup: true,
            bulk_columnar: false,
            transactions: false,
        }
    }

    fn add_vertex(
        &mut self,
        label: &str,
        uid: &str,
        properties: PropertyMap,
    ) -> Result<VertexId, StoreError> {
        let index = self.graph.add_node(VertexData {
            label: label.to_string(),
            uid: uid.to_string(),
            properties,
        });
        // First writer wins; duplicate uids only occur when the caller
        // skipped the keyed lookup.
        self.uid_index.entry(uid.to_string()).or_insert(index);
        Ok(index.index() as VertexId)
    }

    fn vertex(&self, id: VertexId) -> Result<VertexRecord, StoreError> {
        let index = self.node_index(id)?;
        Ok(self.record(index))
    }

    fn vertex_by_uid(&self, uid: &str) -> Result<Option<VertexRecord>, StoreError> {
        Ok(self.uid_index.get(uid).map(|&index| self.record(index)))
    }

    fn vertices_with_label(&self, label: &str) -> Result<Vec<VertexRecord>, StoreError> {
        Ok(self
            .graph
            .node_indices()
            .filter(|&index| self.graph[index].label == label)
            .map(|index| self.record(index))
            .collect())
    }

    fn find_vertices(
        &self,
        label: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<VertexRecord>, StoreError> {
        Ok(self
            .graph
            .node_indices()
            .filter(|&index| {
                let data = &self.graph[index];
                data.label == label
                    && data
                        .properties
                        .get(key)
                        .is_some_and(|values| values.contains(value))
            })
            .map(|index| self.record(index))
            .collect())
    }

    fn merge_vertex_properties(
        &mut self,
        id: VertexId,
        properties: PropertyMap,
    ) -> Result<(), StoreError> {
        let index = self.node_index(id)?;
        self.graph[index].properties.extend(properties);
        Ok(())
    }

    fn remove_vertex(&mut self, id: VertexId) -> Result<(), StoreError> {
        let index = self.node_index(id)?;
        let uid = self.graph[index].uid.clone();
        if self.uid_index.get(&uid) == Some(&index) {
            self.uid_index.remove(&uid);
        }
        self.graph.remove_node(index);
        Ok(())
    }

    fn add_edge(
        &mut self,
        label: &str,
        source: VertexId,
        target: VertexId,
        properties: PropertyMap,
    ) -> Result<EdgeId, StoreError> {
        let source = self.node_index(source)?;
        let target = self.node_index(target)?;
        let index = self.graph.add_edge(
            source,
            target,
            EdgeData {
                label: label.to_string(),
                properties,
            },
        );
        Ok(index.index() as EdgeId)
    }

    fn out_edges(&self, id: VertexId) -> Result<Vec<EdgeRecord>, StoreError> {
        self.edges_directed(id, Direction::Outgoing)
    }

    fn in_edges(&self, id: VertexId) -> Result<Vec<EdgeRecord>, StoreError> {
        self.edges_directed(id, Direction::Incoming)
    }

    fn labels(&self) -> Result<Vec<String>, StoreError> {
        let labels: BTreeSet<String> = self
            .graph
            .node_indices()
            .map(|index| self.graph[index].label.clone())
            .collect();
        Ok(labels.into_iter().collect())
    }

    fn vertex_count(&self) -> Result<usize, StoreError> {
        Ok(self.graph.node_count())
    }

    fn edge_count(&self) -> Result<usize, StoreError> {
        Ok(self.graph.edge_count())
    }
}
