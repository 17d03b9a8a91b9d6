//! Shared per-run import state.
//!
//! One `ImportContext` exists per import run. It owns the topology and
//! the run settings, and provides the helpers every accumulation
//! strategy shares: uid composition (partition-aware), data-property
//! extraction, embedded-object expansion, and reference iteration.

use sha2::{Digest, Sha256};
use tracing::warn;

use graphlode_model::{preserve_unknown, Node, Reference, Topology, Value};
use graphlode_store::PropertyMap;

use crate::resolver::ResolverConfig;

/// Label given to vertices whose record carried no type.
pub const DEFAULT_VERTEX_LABEL: &str = "vertex";

/// Marker label for placeholder vertices created ahead of their node.
/// Contains a ':' so it can never collide with a topology class label.
pub const PLACEHOLDER_LABEL: &str = "graphlode:pending";

/// Separator between the raw identifier and the partition value inside
/// a composed uid. An input identifier can never contain it.
pub const UID_SEPARATOR: char = '\u{1f}';

/// Accumulation strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Pick from the store's capability flags.
    #[default]
    Auto,
    /// Full uid map, client-side edge resolution.
    Generic,
    /// Type-grouped streaming with probabilistic edge resolution.
    Columnar,
    /// Placeholder vertices rewritten in place.
    Native,
}

/// Per-run import settings and shared helpers.
#[derive(Debug)]
pub struct ImportContext {
    topology: Topology,
    batch_size: usize,
    strategy: Strategy,
    resolver: ResolverConfig,
}

impl ImportContext {
    /// Default number of mutations between commits.
    pub const DEFAULT_BATCH_SIZE: usize = 10_000;

    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            strategy: Strategy::Auto,
            resolver: ResolverConfig::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn resolver_config(&self) -> &ResolverConfig {
        &self.resolver
    }

    /// Vertex label for a node: its type, or the default label.
    pub fn label_for<'n>(&self, node: &'n Node) -> &'n str {
        node.type_name.as_deref().unwrap_or(DEFAULT_VERTEX_LABEL)
    }

    /// Compose the store uid for a raw identifier. With a partition
    /// configured the partition value is merged in, so the same
    /// document imported under two partitions never shares vertices.
    pub fn compose_uid(&self, raw_id: &str) -> String {
        match self.topology.partition() {
            Some(partition) => format!("{raw_id}{UID_SEPARATOR}{}", partition.value),
            None => raw_id.to_string(),
        }
    }

    /// Recover the raw identifier from a composed uid.
    pub fn raw_id<'a>(&self, uid: &'a str) -> &'a str {
        uid.split(UID_SEPARATOR).next().unwrap_or(uid)
    }

    /// Deterministic synthesized identifier for vertices the engine
    /// creates itself (embedded children, implicit parents). Stable
    /// across runs so re-imports and normalization are idempotent.
    pub fn synthesize_id(&self, parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        format!("urn:graphlode:{:x}", hasher.finalize())
    }

    /// Extract the storable data properties of a node: declared keys
    /// (single-valued keys keep their last value), the identifier under
    /// the identifier key, unknown ':'-namespaced keys folded into the
    /// unknown blob, and the partition stamp. Undeclared plain keys are
    /// dropped with a warning.
    pub fn data_properties(&self, node: &Node) -> PropertyMap {
        let mut props = PropertyMap::new();
        for (key, values) in &node.properties {
            if key.contains(':') || self.topology.is_reserved_key(key) {
                continue;
            }
            if !self.topology.is_data_property_key(key) {
                warn!(key, node = %node.id, "skipping undeclared property key");
                continue;
            }
            let values = if self.topology.is_multi_value_key(key) {
                values.clone()
            } else {
                values.last().cloned().into_iter().collect()
            };
            props.insert(key.clone(), values);
        }
        if let Some(unknown_key) = self.topology.unknown_key() {
            if let Some(blob) = preserve_unknown(&node.properties) {
                props.insert(unknown_key.to_string(), vec![Value::Str(blob)]);
            }
        }
        if let Some(identifier_key) = self.topology.identifier_key() {
            if !node.id.is_empty() {
                props.insert(identifier_key.to_string(), vec![Value::Str(node.id.clone())]);
            }
        }
        self.stamp_partition(&mut props);
        props
    }

    /// Properties carried by every engine-created edge.
    pub fn edge_properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        self.stamp_partition(&mut props);
        props
    }

    /// Add the partition key/value, when configured.
    pub fn stamp_partition(&self, props: &mut PropertyMap) {
        if let Some(partition) = self.topology.partition() {
            props.insert(
                partition.key.clone(),
                vec![Value::Str(partition.value.clone())],
            );
        }
    }

    /// The declared references of a node. Undeclared reference keys
    /// are dropped with a warning.
    pub fn object_references<'n>(&self, node: &'n Node) -> Vec<(&'n str, &'n [Reference])> {
        node.references
            .iter()
            .filter_map(|(key, refs)| {
                if self.topology.is_object_property_key(key) {
                    Some((key.as_str(), refs.as_slice()))
                } else {
                    warn!(key, node = %node.id, "skipping undeclared reference key");
                    None
                }
            })
            .collect()
    }

    /// Flatten a node and its embedded descendants into standalone
    /// nodes. Each embedded child gets a deterministic synthesized
    /// identifier derived from its parent id, reference key, and
    /// ordinal; the parent's reference is rewritten to that id.
    pub fn expand_embedded(&self, node: Node) -> Vec<Node> {
        let mut out = Vec::new();
        self.expand_into(node, &mut out);
        out
    }

    fn expand_into(&self, mut node: Node, out: &mut Vec<Node>) {
        let parent_id = node.id.clone();
        let mut children = Vec::new();
        for (key, refs) in node.references.iter_mut() {
            for (ordinal, reference) in refs.iter_mut().enumerate() {
                if let Reference::Embedded(_) = reference {
                    let id = self.synthesize_id(&[&parent_id, key, &ordinal.to_string()]);
                    let placeholder = Reference::Id(id.clone());
                    if let Reference::Embedded(child) =
                        std::mem::replace(reference, placeholder)
                    {
                        let mut child = *child;
                        child.id = id;
                        children.push(child);
                    }
                }
            }
        }
        out.push(node);
        for child in children {
            self.expand_into(child, out);
        }
    }
}
