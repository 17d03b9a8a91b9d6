//! Full-map accumulation.
//!
//! The fallback strategy: works against any store, costs O(all nodes)
//! client memory. Every vertex id is kept in a uid map; references are
//! buffered as pending edges and resolved from the map at finish.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use graphlode_model::Node;
use graphlode_store::{GraphStore, VertexId};

use crate::accumulator::{NodeAccumulator, PendingEdge};
use crate::batch::BatchController;
use crate::context::ImportContext;
use crate::error::ImportError;

pub struct GenericAccumulator<'a> {
    store: &'a mut dyn GraphStore,
    ctx: &'a ImportContext,
    vertices: HashMap<String, VertexId>,
    edges: Vec<PendingEdge>,
    batch: BatchController,
    finished: bool,
}

impl<'a> GenericAccumulator<'a> {
    pub fn new(store: &'a mut dyn GraphStore, ctx: &'a ImportContext) -> Result<Self, ImportError> {
        let batch = BatchController::start(ctx.batch_size(), store)?;
        Ok(Self {
            store,
            ctx,
            vertices: HashMap::new(),
            edges: Vec::new(),
            batch,
            finished: false,
        })
    }
}

impl NodeAccumulator for GenericAccumulator<'_> {
    fn add_node(&mut self, node: Node) -> Result<(), ImportError> {
        if self.finished {
            return Err(ImportError::AlreadyFinished);
        }
        if node.id.is_empty() {
            warn!("skipping node without identifier");
            return Ok(());
        }
        for node in self.ctx.expand_embedded(node) {
            let label = self.ctx.label_for(&node).to_string();
            let uid = self.ctx.compose_uid(&node.id);

            for (key, refs) in self.ctx.object_references(&node) {
                for reference in refs {
                    if let Some(target) = reference.id() {
                        self.edges.push(PendingEdge {
                            edge_label: key.to_string(),
                            source_label: label.clone(),
                            source_uid: uid.clone(),
                            target_uid: self.ctx.compose_uid(target),
                            source_id: node.id.clone(),
                            target_id: target.to_string(),
                        });
                    }
                }
            }

            let props = self.ctx.data_properties(&node);
            match self.vertices.get(&uid).copied() {
                // Same identifier seen again: merge, last write wins.
                Some(id) => self.store.merge_vertex_properties(id, props)?,
                None => {
                    let id = self.store.add_vertex(&label, &uid, props)?;
                    self.vertices.insert(uid, id);
                }
            }
            self.batch.record_mutation(&mut *self.store)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ImportError> {
        if self.finished {
            return Err(ImportError::AlreadyFinished);
        }
        self.finished = true;

        let edge_props = self.ctx.edge_properties();
        let mut seen = HashSet::new();
        for edge in std::mem::take(&mut self.edges) {
            if !seen.insert((
                edge.source_uid.clone(),
                edge.edge_label.clone(),
                edge.target_uid.clone(),
            )) {
                continue;
            }
            // add_node inserted every pending edge's source into the
            // map, so a miss here means the map is inconsistent.
            let source = *self
                .vertices
                .get(&edge.source_uid)
                .ok_or_else(|| {
                    ImportError::dangling(&edge.source_id, &edge.edge_label, &edge.target_id)
                })?;
            let target = *self
                .vertices
                .get(&edge.target_uid)
                .ok_or_else(|| {
                    ImportError::dangling(&edge.source_id, &edge.edge_label, &edge.target_id)
                })?;
            self.store
                .add_edge(&edge.edge_label, source, target, edge_props.clone())?;
            self.batch.record_mutation(&mut *self.store)?;
        }

        self.batch.flush(&mut *self.store)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlode_model::{Topology, Value};
    use graphlode_store::MemoryStore;

    fn ctx() -> ImportContext {
        let topology = Topology::build()
            .class("File", "x:File")
            .data_property("path", "x:path")
            .object_property("parent", "x:parent")
            .identifier_key("_id")
            .build()
            .unwrap();
        ImportContext::new(topology)
    }

    #[test]
    fn test_forward_reference_resolves_at_finish() {
        let mut store = MemoryStore::new();
        let ctx = ctx();
        {
            let mut acc = GenericAccumulator::new(&mut store, &ctx).unwrap();
            // reference arrives before its target
            acc.add_node(Node::new("urn:a", "File").with_reference("parent", "urn:b"))
                .unwrap();
            acc.add_node(Node::new("urn:b", "File").with_property("path", "/b"))
                .unwrap();
            acc.finish().unwrap();
        }
        assert_eq!(store.vertex_count().unwrap(), 2);
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn test_dangling_reference_is_an_error() {
        let mut store = MemoryStore::new();
        let ctx = ctx();
        let mut acc = GenericAccumulator::new(&mut store, &ctx).unwrap();
        acc.add_node(Node::new("urn:a", "File").with_reference("parent", "urn:missing"))
            .unwrap();
        let err = acc.finish().unwrap_err();
        match err {
            ImportError::DanglingReference {
                source_id,
                edge_label,
                target_id,
            } => {
                assert_eq!(source_id, "urn:a");
                assert_eq!(edge_label, "parent");
                assert_eq!(target_id, "urn:missing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_node_merges() {
        let mut store = MemoryStore::new();
        let ctx = ctx();
        {
            let mut acc = GenericAccumulator::new(&mut store, &ctx).unwrap();
            acc.add_node(Node::new("urn:a", "File").with_property("path", "/old"))
                .unwrap();
            acc.add_node(Node::new("urn:a", "File").with_property("path", "/new"))
                .unwrap();
            acc.finish().unwrap();
        }
        assert_eq!(store.vertex_count().unwrap(), 1);
        let record = store.vertex_by_uid("urn:a").unwrap().unwrap();
        assert_eq!(record.properties["path"], vec![Value::from("/new")]);
    }

    #[test]
    fn test_duplicate_edges_created_once() {
        let mut store = MemoryStore::new();
        let ctx = ctx();
        {
            let mut acc = GenericAccumulator::new(&mut store, &ctx).unwrap();
            acc.add_node(
                Node::new("urn:a", "File")
                    .with_reference("parent", "urn:b")
                    .with_reference("parent", "urn:b"),
            )
            .unwrap();
            acc.add_node(Node::new("urn:b", "File")).unwrap();
            acc.finish().unwrap();
        }
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn test_finish_is_single_use() {
        let mut store = MemoryStore::new();
        let ctx = ctx();
        let mut acc = GenericAccumulator::new(&mut store, &ctx).unwrap();
        acc.finish().unwrap();
        assert!(matches!(acc.finish(), Err(ImportError::AlreadyFinished)));
        assert!(matches!(
            acc.add_node(Node::new("urn:a", "File")),
            Err(ImportError::AlreadyFinished)
        ));
    }
}
