//! Export back to node records.
//!
//! The inverse of import: vertices become nodes, outgoing edges become
//! references, embedded targets are inlined as child nodes, and the
//! unknown-property blob is spliced back to top-level keys, so a full
//! import/export cycle preserves unrecognized data.

use tracing::debug;

use graphlode_model::{restore_unknown, Node, Reference, Value};
use graphlode_store::{GraphStore, VertexRecord};

use crate::context::{ImportContext, DEFAULT_VERTEX_LABEL, PLACEHOLDER_LABEL};
use crate::error::ExportError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Also export implicit vertices and edges created during
    /// normalization.
    pub include_implicit: bool,
}

pub struct ExportPipeline<'a> {
    store: &'a dyn GraphStore,
    ctx: &'a ImportContext,
    options: ExportOptions,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(store: &'a dyn GraphStore, ctx: &'a ImportContext) -> Self {
        Self {
            store,
            ctx,
            options: ExportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Export every eligible vertex as a node record.
    ///
    /// Eligible labels are everything in the store except the metadata
    /// label, the placeholder marker, and embedded classes (their
    /// vertices are inlined into their parents instead). Vertices with
    /// unrecognized labels are exported as-is, so they survive a round
    /// trip.
    pub fn export(&self) -> Result<Vec<Node>, ExportError> {
        let topology = self.ctx.topology();
        let mut nodes = Vec::new();
        for label in self.store.labels()? {
            if label == PLACEHOLDER_LABEL
                || topology.metadata_label() == Some(label.as_str())
                || topology.is_embedded_label(&label)
            {
                continue;
            }
            for record in self.store.vertices_with_label(&label)? {
                if !self.options.include_implicit && self.is_implicit(&record.properties) {
                    continue;
                }
                nodes.push(self.to_node(&record)?);
            }
        }
        debug!(nodes = nodes.len(), "exported node records");
        Ok(nodes)
    }

    fn is_implicit(&self, properties: &graphlode_store::PropertyMap) -> bool {
        self.ctx
            .topology()
            .implicit_key()
            .and_then(|key| properties.get(key))
            .and_then(|values| values.first())
            .is_some_and(|value| *value == Value::Bool(true))
    }

    fn exported_id(&self, record: &VertexRecord) -> String {
        self.ctx
            .topology()
            .identifier_key()
            .and_then(|key| record.properties.get(key))
            .and_then(|values| values.first())
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.ctx.raw_id(&record.uid).to_string())
    }

    fn to_node(&self, record: &VertexRecord) -> Result<Node, ExportError> {
        let topology = self.ctx.topology();
        let mut node = if record.label == DEFAULT_VERTEX_LABEL {
            Node::untyped(self.exported_id(record))
        } else {
            Node::new(self.exported_id(record), record.label.clone())
        };

        for (key, values) in &record.properties {
            if topology.unknown_key() == Some(key.as_str()) {
                if let Some(blob) = values.first().and_then(Value::as_str) {
                    restore_unknown(blob, &mut node.properties);
                }
                continue;
            }
            if topology.is_reserved_key(key) || topology.root_label() == Some(key.as_str()) {
                continue;
            }
            node.properties.insert(key.clone(), values.clone());
        }

        for edge in self.store.out_edges(record.id)? {
            if !self.options.include_implicit && self.is_implicit(&edge.properties) {
                continue;
            }
            if topology.root_label() == Some(edge.label.as_str()) {
                continue;
            }
            let target = self.store.vertex(edge.target)?;
            let reference = if topology.is_embedded_label(&target.label) {
                let mut child = self.to_node(&target)?;
                child.id = String::new();
                Reference::Embedded(Box::new(child))
            } else {
                Reference::Id(self.exported_id(&target))
            };
            node.references.entry(edge.label).or_default().push(reference);
        }

        Ok(node)
    }
}
