//! Placeholder-rewrite accumulation.
//!
//! For stores with cheap exact lookup. Nothing is buffered client
//! side: references are materialized immediately, targeting either the
//! existing vertex or a placeholder created under a reserved marker
//! label. When the real node arrives its placeholder is replaced and
//! the inbound edges are rewired. Placeholders still present at finish
//! are dangling references.

use tracing::warn;

use graphlode_model::Node;
use graphlode_store::{GraphStore, PropertyMap, VertexId};

use crate::batch::BatchController;
use crate::context::{ImportContext, PLACEHOLDER_LABEL};
use crate::error::ImportError;
use crate::accumulator::NodeAccumulator;

pub struct NativeGraphAccumulator<'a> {
    store: &'a mut dyn GraphStore,
    ctx: &'a ImportContext,
    batch: BatchController,
    finished: bool,
}

impl<'a> NativeGraphAccumulator<'a> {
    pub fn new(store: &'a mut dyn GraphStore, ctx: &'a ImportContext) -> Result<Self, ImportError> {
        let batch = BatchController::start(ctx.batch_size(), store)?;
        Ok(Self {
            store,
            ctx,
            batch,
            finished: false,
        })
    }

    /// Upsert one flattened node, returning its vertex id.
    fn upsert(&mut self, node: &Node) -> Result<VertexId, ImportError> {
        let label = self.ctx.label_for(node);
        let uid = self.ctx.compose_uid(&node.id);
        let props = self.ctx.data_properties(node);

        let id = match self.store.vertex_by_uid(&uid)? {
            Some(existing) if existing.label == PLACEHOLDER_LABEL => {
                // The real node has arrived: replace the placeholder
                // and rewire its inbound edges.
                let inbound = self.store.in_edges(existing.id)?;
                self.store.remove_vertex(existing.id)?;
                let id = self.store.add_vertex(label, &uid, props)?;
                for edge in inbound {
                    self.store
                        .add_edge(&edge.label, edge.source, id, edge.properties)?;
                    self.batch.record_mutation(&mut *self.store)?;
                }
                id
            }
            Some(existing) => {
                self.store.merge_vertex_properties(existing.id, props)?;
                existing.id
            }
            None => self.store.add_vertex(label, &uid, props)?,
        };
        self.batch.record_mutation(&mut *self.store)?;
        Ok(id)
    }

    /// Find the reference target, creating a placeholder when it has
    /// not arrived yet.
    fn target_vertex(&mut self, target_uid: &str) -> Result<VertexId, ImportError> {
        if let Some(existing) = self.store.vertex_by_uid(target_uid)? {
            return Ok(existing.id);
        }
        let id = self
            .store
            .add_vertex(PLACEHOLDER_LABEL, target_uid, PropertyMap::new())?;
        self.batch.record_mutation(&mut *self.store)?;
        Ok(id)
    }

    fn edge_exists(&self, source: VertexId, label: &str, target: VertexId) -> Result<bool, ImportError> {
        Ok(self
            .store
            .out_edges(source)?
            .iter()
            .any(|edge| edge.label == label && edge.target == target))
    }
}

impl NodeAccumulator for NativeGraphAccumulator<'_> {
    fn add_node(&mut self, node: Node) -> Result<(), ImportError> {
        if self.finished {
            return Err(ImportError::AlreadyFinished);
        }
        if node.id.is_empty() {
            warn!("skipping node without identifier");
            return Ok(());
        }
        let edge_props = self.ctx.edge_properties();
        for node in self.ctx.expand_embedded(node) {
            let source = self.upsert(&node)?;
            for (key, refs) in self.ctx.object_references(&node) {
                for reference in refs {
                    let Some(target_id) = reference.id() else {
                        continue;
                    };
                    let target_uid = self.ctx.compose_uid(target_id);
                    let target = self.target_vertex(&target_uid)?;
                    if self.edge_exists(source, key, target)? {
                        continue;
                    }
                    self.store.add_edge(key, source, target, edge_props.clone())?;
                    self.batch.record_mutation(&mut *self.store)?;
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ImportError> {
        if self.finished {
            return Err(ImportError::AlreadyFinished);
        }
        self.finished = true;

        // Any surviving placeholder is a reference whose target never
        // arrived; report the first one with its inbound context.
        let placeholders = self.store.vertices_with_label(PLACEHOLDER_LABEL)?;
        for placeholder in &placeholders {
            let inbound = self.store.in_edges(placeholder.id)?;
            if let Some(edge) = inbound.first() {
                let source = self.store.vertex(edge.source)?;
                return Err(ImportError::dangling(
                    self.ctx.raw_id(&source.uid),
                    &edge.label,
                    self.ctx.raw_id(&placeholder.uid),
                ));
            }
            // unreachable in practice: placeholders are only created
            // as edge targets
            self.store.remove_vertex(placeholder.id)?;
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
            .embedded_class("Note", "x:Note")
            .data_property("path", "x:path")
            .data_property("text", "x:text")
            .object_property("parent", "x:parent")
            .object_property("note", "x:note")
            .identifier_key("_id")
            .build()
            .unwrap();
        ImportContext::new(topology)
    }

    fn import(store: &mut MemoryStore, ctx: &ImportContext, nodes: Vec<Node>) {
        let mut acc = NativeGraphAccumulator::new(store, ctx).unwrap();
        for node in nodes {
            acc.add_node(node).unwrap();
        }
        acc.finish().unwrap();
    }

    #[test]
    fn test_forward_reference_via_placeholder() {
        let mut store = MemoryStore::new();
        let ctx = ctx();
        {
            let mut acc = NativeGraphAccumulator::new(&mut store, &ctx).unwrap();
            acc.add_node(Node::new("urn:a", "File").with_reference("parent", "urn:b"))
                .unwrap();
            // mid-stream the placeholder exists
            let pending = store_placeholder_count(&*acc.store);
            assert_eq!(pending, 1);
            acc.add_node(Node::new("urn:b", "File").with_property("path", "/b"))
                .unwrap();
            acc.finish().unwrap();
        }
        assert_eq!(store.vertex_count().unwrap(), 2);
        assert_eq!(store.edge_count().unwrap(), 1);
        let b = store.vertex_by_uid("urn:b").unwrap().unwrap();
        assert_eq!(b.label, "File");
        assert_eq!(b.properties["path"], vec![Value::from("/b")]);
        // the rewired edge points at the real vertex
        let edges = store.in_edges(b.id).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].label, "parent");
    }

    fn store_placeholder_count(store: &dyn GraphStore) -> usize {
        store
            .vertices_with_label(PLACEHOLDER_LABEL)
            .unwrap()
            .len()
    }

    #[test]
    fn test_dangling_reference_reported_with_context() {
        let mut store = MemoryStore::new();
        let ctx = ctx();
        let mut acc = NativeGraphAccumulator::new(&mut store, &ctx).unwrap();
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
    fn test_reimport_is_idempotent() {
        let mut store = MemoryStore::new();
        let ctx = ctx();
        let nodes = || {
            vec![
                Node::new("urn:a", "File").with_reference("parent", "urn:b"),
                Node::new("urn:b", "File"),
            ]
        };
        import(&mut store, &ctx, nodes());
        import(&mut store, &ctx, nodes());
        assert_eq!(store.vertex_count().unwrap(), 2);
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn test_embedded_child_linked_inline() {
        let mut store = MemoryStore::new();
        let ctx = ctx();
        import(
            &mut store,
            &ctx,
            vec![Node::new("urn:a", "File")
                .with_embedded("note", Node::new("", "Note").with_property("text", "hi"))],
        );
        assert_eq!(store.vertex_count().unwrap(), 2);
        assert_eq!(store.edge_count().unwrap(), 1);
        let notes = store.vertices_with_label("Note").unwrap();
        assert_eq!(notes[0].properties["text"], vec![Value::from("hi")]);
    }
}
