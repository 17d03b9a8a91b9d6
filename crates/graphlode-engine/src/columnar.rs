//! Type-grouped streaming accumulation.
//!
//! Built for columnar stores where vertex inserts are cheap when rows
//! share a schema. Input must arrive grouped by type (untyped last, as
//! [`import_nodes`](crate::import_nodes) sorts it); a type change
//! flushes the current buffer, so each buffer holds one type padded to
//! the union of its keys.
//!
//! No id map is kept. Reference targets are resolved per label through
//! the [`EdgeResolver`]: a false positive just contributes a
//! `(source, target)` pair to one extra bulk join, which matches
//! nothing and creates nothing. Zero candidates is a hard error, the
//! target really never arrived.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use graphlode_model::Node;
use graphlode_store::{ColumnarRow, GraphStore, PropertyMap};

use crate::accumulator::{NodeAccumulator, PendingEdge};
use crate::batch::BatchController;
use crate::context::ImportContext;
use crate::error::ImportError;
use crate::resolver::EdgeResolver;

pub struct ColumnarBulkAccumulator<'a> {
    store: &'a mut dyn GraphStore,
    ctx: &'a ImportContext,
    resolver: EdgeResolver,
    /// Type currently being buffered.
    current_label: Option<String>,
    buffer: Vec<(String, PropertyMap)>,
    /// Embedded children arrive out of type order; they get their own
    /// per-label buffers, streamed at the start of finish.
    embedded: BTreeMap<String, Vec<(String, PropertyMap)>>,
    /// Labels that received at least one vertex this run.
    observed: BTreeSet<String>,
    edges: Vec<PendingEdge>,
    batch: BatchController,
    finished: bool,
}

impl<'a> ColumnarBulkAccumulator<'a> {
    pub fn new(store: &'a mut dyn GraphStore, ctx: &'a ImportContext) -> Result<Self, ImportError> {
        let batch = BatchController::start(ctx.batch_size(), store)?;
        Ok(Self {
            store,
            ctx,
            resolver: EdgeResolver::new(ctx.resolver_config().clone()),
            current_label: None,
            buffer: Vec::new(),
            embedded: BTreeMap::new(),
            observed: BTreeSet::new(),
            edges: Vec::new(),
            batch,
            finished: false,
        })
    }

    fn record_references(&mut self, node: &Node, label: &str, uid: &str) {
        for (key, refs) in self.ctx.object_references(node) {
            for reference in refs {
                if let Some(target) = reference.id() {
                    self.edges.push(PendingEdge {
                        edge_label: key.to_string(),
                        source_label: label.to_string(),
                        source_uid: uid.to_string(),
                        target_uid: self.ctx.compose_uid(target),
                        source_id: node.id.clone(),
                        target_id: target.to_string(),
                    });
                }
            }
        }
    }

    /// Stream one label's buffered rows, padded to their union schema.
    fn stream(
        store: &mut dyn GraphStore,
        batch: &mut BatchController,
        label: &str,
        rows: Vec<(String, PropertyMap)>,
    ) -> Result<(), ImportError> {
        if rows.is_empty() {
            return Ok(());
        }
        let columns: Vec<String> = rows
            .iter()
            .flat_map(|(_, props)| props.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let count = rows.len();
        let rows = rows
            .into_iter()
            .map(|(uid, mut props)| ColumnarRow {
                uid,
                values: columns.iter().map(|column| props.remove(column)).collect(),
            })
            .collect();
        store.stream_vertices(label, &columns, rows)?;
        debug!(label, count, "streamed type group");
        batch.record_mutations(store, count)?;
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<(), ImportError> {
        if let Some(label) = self.current_label.take() {
            let rows = std::mem::take(&mut self.buffer);
            Self::stream(&mut *self.store, &mut self.batch, &label, rows)?;
        }
        Ok(())
    }
}

impl NodeAccumulator for ColumnarBulkAccumulator<'_> {
    fn add_node(&mut self, node: Node) -> Result<(), ImportError> {
        if self.finished {
            return Err(ImportError::AlreadyFinished);
        }
        if node.id.is_empty() {
            warn!("skipping node without identifier");
            return Ok(());
        }
        if node.type_name.is_none() {
            // The streaming path has no schema to put these under.
            warn!(node = %node.id, "skipping node without type");
            return Ok(());
        }

        let mut flattened = self.ctx.expand_embedded(node).into_iter();
        // First element is the input node itself, the rest are its
        // embedded descendants.
        if let Some(node) = flattened.next() {
            let label = self.ctx.label_for(&node).to_string();
            let uid = self.ctx.compose_uid(&node.id);
            self.record_references(&node, &label, &uid);
            self.resolver.add(&label, &uid);
            self.observed.insert(label.clone());

            if self.current_label.as_deref() != Some(label.as_str()) {
                self.flush_buffer()?;
                self.current_label = Some(label);
            }
            self.buffer.push((uid, self.ctx.data_properties(&node)));
        }
        for child in flattened {
            let label = self.ctx.label_for(&child).to_string();
            let uid = self.ctx.compose_uid(&child.id);
            self.record_references(&child, &label, &uid);
            self.resolver.add(&label, &uid);
            self.observed.insert(label.clone());
            self.embedded
                .entry(label)
                .or_default()
                .push((uid, self.ctx.data_properties(&child)));
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ImportError> {
        if self.finished {
            return Err(ImportError::AlreadyFinished);
        }
        self.finished = true;

        self.flush_buffer()?;
        for (label, rows) in std::mem::take(&mut self.embedded) {
            Self::stream(&mut *self.store, &mut self.batch, &label, rows)?;
        }

        // Identifiers seen more than once produced split rows; merge
        // them before edges are joined on the uid column.
        for label in &self.observed {
            self.store.collapse_duplicate_vertices(label)?;
        }

        // Group pending edges into one bulk join per (edge label,
        // source label, candidate target label). A set per group, so a
        // reference listed twice yields one pair.
        let mut groups: BTreeMap<(String, String, String), BTreeSet<(String, String)>> =
            BTreeMap::new();
        for edge in std::mem::take(&mut self.edges) {
            let candidates = self.resolver.candidates(&edge.target_uid);
            if candidates.is_empty() {
                return Err(ImportError::dangling(
                    &edge.source_id,
                    &edge.edge_label,
                    &edge.target_id,
                ));
            }
            for candidate in candidates {
                groups
                    .entry((
                        edge.edge_label.clone(),
                        edge.source_label.clone(),
                        candidate.to_string(),
                    ))
                    .or_default()
                    .insert((edge.source_uid.clone(), edge.target_uid.clone()));
            }
        }

        let edge_props = self.ctx.edge_properties();
        for ((edge_label, source_label, target_label), pairs) in groups {
            let pairs: Vec<(String, String)> = pairs.into_iter().collect();
            let created = self.store.bulk_add_edges(
                &edge_label,
                &source_label,
                &target_label,
                &pairs,
                &edge_props,
            )?;
            self.batch.record_mutations(&mut *self.store, created)?;
        }

        self.batch.flush(&mut *self.store)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlode_model::{Topology, Value};
    use graphlode_store::SqliteStore;

    fn ctx() -> ImportContext {
        let topology = Topology::build()
            .class("File", "x:File")
            .class("Project", "x:Project")
            .embedded_class("Note", "x:Note")
            .data_property("path", "x:path")
            .data_property("name", "x:name")
            .data_property("text", "x:text")
            .object_property("parent", "x:parent")
            .object_property("note", "x:note")
            .identifier_key("_id")
            .build()
            .unwrap();
        ImportContext::new(topology)
    }

    fn import(store: &mut SqliteStore, ctx: &ImportContext, nodes: Vec<Node>) {
        let mut acc = ColumnarBulkAccumulator::new(store, ctx).unwrap();
        for node in nodes {
            acc.add_node(node).unwrap();
        }
        acc.finish().unwrap();
    }

    #[test]
    fn test_type_grouped_stream_with_union_schema() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let ctx = ctx();
        import(
            &mut store,
            &ctx,
            vec![
                Node::new("urn:a", "File").with_property("path", "/a"),
                Node::new("urn:b", "File").with_property("name", "b"),
                Node::new("urn:p", "Project").with_property("name", "proj"),
            ],
        );
        assert_eq!(store.vertex_count().unwrap(), 3);
        // padded column is absent, not null
        let a = store.vertex_by_uid("urn:a").unwrap().unwrap();
        assert!(!a.properties.contains_key("name"));
    }

    #[test]
    fn test_forward_and_cross_type_references() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let ctx = ctx();
        import(
            &mut store,
            &ctx,
            vec![
                Node::new("urn:a", "File").with_reference("parent", "urn:p"),
                Node::new("urn:b", "File").with_reference("parent", "urn:a"),
                Node::new("urn:p", "Project"),
            ],
        );
        assert_eq!(store.edge_count().unwrap(), 2);
    }

    #[test]
    fn test_dangling_reference_is_an_error() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let ctx = ctx();
        let mut acc = ColumnarBulkAccumulator::new(&mut store, &ctx).unwrap();
        acc.add_node(Node::new("urn:a", "File").with_reference("parent", "urn:missing"))
            .unwrap();
        let err = acc.finish().unwrap_err();
        assert!(matches!(
            err,
            ImportError::DanglingReference { ref target_id, .. } if target_id == "urn:missing"
        ));
    }

    #[test]
    fn test_duplicate_edges_created_once() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let ctx = ctx();
        import(
            &mut store,
            &ctx,
            vec![
                Node::new("urn:a", "File")
                    .with_reference("parent", "urn:b")
                    .with_reference("parent", "urn:b"),
                Node::new("urn:b", "File"),
            ],
        );
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_uids_collapse() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let ctx = ctx();
        import(
            &mut store,
            &ctx,
            vec![
                Node::new("urn:a", "File").with_property("path", "/old"),
                Node::new("urn:a", "File").with_property("name", "a"),
            ],
        );
        assert_eq!(store.vertex_count().unwrap(), 1);
        let a = store.vertex_by_uid("urn:a").unwrap().unwrap();
        assert_eq!(a.properties["path"], vec![Value::from("/old")]);
        assert_eq!(a.properties["name"], vec![Value::from("a")]);
    }

    #[test]
    fn test_embedded_children_stream_from_side_buffer() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let ctx = ctx();
        import(
            &mut store,
            &ctx,
            vec![
                Node::new("urn:a", "File")
                    .with_embedded("note", Node::new("", "Note").with_property("text", "hi")),
                Node::new("urn:b", "File"),
            ],
        );
        assert_eq!(store.vertex_count().unwrap(), 3);
        assert_eq!(store.edge_count().unwrap(), 1);
        let notes = store.vertices_with_label("Note").unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].properties["text"], vec![Value::from("hi")]);
    }

    #[test]
    fn test_untyped_nodes_skipped() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let ctx = ctx();
        import(
            &mut store,
            &ctx,
            vec![
                Node::new("urn:a", "File"),
                Node::untyped("urn:odd").with_property("path", "/x"),
            ],
        );
        assert_eq!(store.vertex_count().unwrap(), 1);
    }
}
