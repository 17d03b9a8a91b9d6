//! Post-import normalization.
//!
//! Two idempotent passes over an already-imported graph:
//!
//! 1. Hierarchy completion: vertices of a configured hierarchical type
//!    carry a slash-delimited path; any such vertex without a parent
//!    edge gets one, creating missing ancestor vertices (flagged
//!    implicit) along the way. Runs to a fixed point, bounded by tree
//!    depth.
//! 2. Root-object assignment: pick one root candidate without an
//!    incoming sub-object edge and connect it to the metadata vertex
//!    under the root label.
//!
//! Running normalization twice changes nothing the second time.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use graphlode_model::Value;
use graphlode_store::{GraphStore, PropertyMap, VertexId};

use crate::batch::BatchController;
use crate::context::ImportContext;
use crate::error::ImportError;

/// What a normalization run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizationReport {
    pub passes: usize,
    pub created_parents: usize,
    pub parent_edges: usize,
    pub root_assigned: bool,
}

pub struct NormalizationEngine<'a> {
    store: &'a mut dyn GraphStore,
    ctx: &'a ImportContext,
    batch: BatchController,
}

impl<'a> NormalizationEngine<'a> {
    pub fn new(store: &'a mut dyn GraphStore, ctx: &'a ImportContext) -> Result<Self, ImportError> {
        let batch = BatchController::start(ctx.batch_size(), store)?;
        Ok(Self { store, ctx, batch })
    }

    pub fn run(&mut self) -> Result<NormalizationReport, ImportError> {
        let mut report = NormalizationReport::default();
        self.complete_hierarchy(&mut report)?;
        self.assign_root(&mut report)?;
        self.batch.flush(&mut *self.store)?;
        info!(?report, "normalization finished");
        Ok(report)
    }

    /// Properties for engine-created edges: partition stamp plus the
    /// implicit flag.
    fn implicit_edge_properties(&self) -> PropertyMap {
        let mut props = self.ctx.edge_properties();
        if let Some(key) = self.ctx.topology().implicit_key() {
            props.insert(key.to_string(), vec![Value::Bool(true)]);
        }
        props
    }

    fn complete_hierarchy(&mut self, report: &mut NormalizationReport) -> Result<(), ImportError> {
        let Some(spec) = self.ctx.topology().hierarchy().cloned() else {
            return Ok(());
        };
        let edge_props = self.implicit_edge_properties();

        loop {
            report.passes += 1;
            let mut changed = false;
            // One creation candidate per missing parent path per pass;
            // the remaining orphans link up next pass once the parent
            // exists.
            let mut creations: BTreeMap<String, VertexId> = BTreeMap::new();

            for vertex in self.store.vertices_with_label(&spec.label)? {
                let has_parent = self
                    .store
                    .out_edges(vertex.id)?
                    .iter()
                    .any(|edge| edge.label == spec.parent_edge_label);
                if has_parent {
                    continue;
                }
                if let Some(base) = &spec.base_edge_label {
                    let is_base = self
                        .store
                        .in_edges(vertex.id)?
                        .iter()
                        .any(|edge| &edge.label == base);
                    if is_base {
                        continue;
                    }
                }
                let Some(path) = vertex
                    .properties
                    .get(&spec.path_key)
                    .and_then(|values| values.first())
                    .and_then(Value::as_str)
                else {
                    continue;
                };
                if spec.root_paths.contains(path) {
                    continue;
                }
                let Some(parent_path) = parent_path(path) else {
                    continue;
                };

                let existing = self.store.find_vertices(
                    &spec.label,
                    &spec.path_key,
                    &Value::Str(parent_path.clone()),
                )?;
                if let Some(parent) = existing.first() {
                    self.store.add_edge(
                        &spec.parent_edge_label,
                        vertex.id,
                        parent.id,
                        edge_props.clone(),
                    )?;
                    self.batch.record_mutation(&mut *self.store)?;
                    report.parent_edges += 1;
                    changed = true;
                } else {
                    creations.entry(parent_path).or_insert(vertex.id);
                }
            }

            for (path, orphan) in creations {
                let raw_id = self.ctx.synthesize_id(&[&spec.label, &path]);
                let uid = self.ctx.compose_uid(&raw_id);

                let mut props = PropertyMap::new();
                props.insert(spec.path_key.clone(), vec![Value::Str(path.clone())]);
                if let Some(key) = self.ctx.topology().implicit_key() {
                    props.insert(key.to_string(), vec![Value::Bool(true)]);
                }
                if let Some(key) = self.ctx.topology().identifier_key() {
                    props.insert(key.to_string(), vec![Value::Str(raw_id.clone())]);
                }
                self.ctx.stamp_partition(&mut props);

                let parent = self.store.add_vertex(&spec.label, &uid, props)?;
                self.batch.record_mutation(&mut *self.store)?;
                debug!(path, "created implicit parent");
                report.created_parents += 1;

                self.store
                    .add_edge(&spec.parent_edge_label, orphan, parent, edge_props.clone())?;
                self.batch.record_mutation(&mut *self.store)?;
                report.parent_edges += 1;
                changed = true;
            }

            if !changed {
                break;
            }
        }
        Ok(())
    }

    fn assign_root(&mut self, report: &mut NormalizationReport) -> Result<(), ImportError> {
        let topology = self.ctx.topology();
        let (Some(spec), Some(root_label), Some(metadata_label)) = (
            topology.root().cloned(),
            topology.root_label().map(str::to_string),
            topology.metadata_label().map(str::to_string),
        ) else {
            return Ok(());
        };

        let metadata = self.store.vertices_with_label(&metadata_label)?;
        let Some(metadata) = metadata.first() else {
            warn!("no metadata vertex, skipping root assignment");
            return Ok(());
        };
        let already_assigned = self
            .store
            .out_edges(metadata.id)?
            .iter()
            .any(|edge| edge.label == root_label);
        if already_assigned {
            return Ok(());
        }

        let mut candidates = self.store.vertices_with_label(&spec.label)?;
        let mut without_parent = Vec::new();
        for candidate in candidates.drain(..) {
            let is_sub_object = self
                .store
                .in_edges(candidate.id)?
                .iter()
                .any(|edge| edge.label == spec.sub_edge_label);
            if !is_sub_object {
                without_parent.push(candidate);
            }
        }
        // Smallest uid wins: deterministic, but arbitrary beyond that.
        let Some(root) = without_parent.into_iter().min_by(|l, r| l.uid.cmp(&r.uid)) else {
            warn!(label = %spec.label, "no root candidate, skipping root assignment");
            return Ok(());
        };

        let mut flag = PropertyMap::new();
        flag.insert(root_label.clone(), vec![Value::Bool(true)]);
        self.store.merge_vertex_properties(root.id, flag)?;
        self.store.add_edge(
            &root_label,
            metadata.id,
            root.id,
            self.implicit_edge_properties(),
        )?;
        self.batch.record_mutation(&mut *self.store)?;
        report.root_assigned = true;
        Ok(())
    }
}

/// Parent of a slash-delimited path; `None` for roots and relative
/// single segments.
fn parent_path(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let split = trimmed.rfind('/')?;
    if split == 0 {
        return Some("/".to_string());
    }
    Some(trimmed[..split].to_string())
}
