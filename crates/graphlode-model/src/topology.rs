//! Topology configuration.
//!
//! The topology is the static mapping between the type/property names
//! used by node records and the labels/columns used by the backing
//! store. It also declares which classes are embedded, which property
//! keys are multi-valued, and the reserved internal keys (identifier,
//! unknown-properties blob, implicit-flag, partition).
//!
//! All validation happens exactly once, in [`TopologyBuilder::build`].
//! The accumulators rely on that: reserved-key invariants are never
//! re-checked per node.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised eagerly while building a topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// A reserved key or label collides with a declared name
    #[error("reserved name '{name}' conflicts with a declared {kind}")]
    ReservedConflict { name: String, kind: &'static str },

    /// Keys containing ':' are reserved for unknown-property passthrough
    #[error("key '{0}' is invalid: ':' is reserved for unknown properties")]
    InvalidKey(String),

    /// A root label requires a metadata label to hang the edge from
    #[error("root_label cannot be configured without metadata_label")]
    RootWithoutMetadata,

    /// Topology file could not be read
    #[error("failed to read topology file: {0}")]
    Io(#[from] std::io::Error),

    /// Topology file could not be parsed
    #[error("failed to parse topology file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Partition discriminator merged into generated identifiers and
/// stamped onto every vertex and edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Property key the partition value is stored under.
    pub key: String,
    /// The partition value for this run.
    pub value: String,
}

/// Hierarchy-completion settings for the normalization pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchySpec {
    /// Vertex label of the hierarchical type.
    pub label: String,
    /// Property key holding the slash-delimited path.
    pub path_key: String,
    /// Edge label for the inferred parent relationship.
    pub parent_edge_label: String,
    /// Paths that terminate the hierarchy (no parent is inferred).
    #[serde(default)]
    pub root_paths: BTreeSet<String>,
    /// Optional edge label whose targets are also treated as roots.
    #[serde(default)]
    pub base_edge_label: Option<String>,
}

/// Root-object assignment settings for the normalization pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSpec {
    /// Vertex label of root candidates.
    pub label: String,
    /// Edge label that disqualifies a candidate when incoming.
    pub sub_edge_label: String,
}

/// The immutable topology. Construct via [`Topology::build`].
#[derive(Debug, Clone)]
pub struct Topology {
    classes: BTreeMap<String, String>,
    embedded_classes: BTreeSet<String>,
    data_properties: BTreeMap<String, String>,
    multi_value_keys: BTreeSet<String>,
    object_properties: BTreeMap<String, String>,
    metadata_label: Option<String>,
    root_label: Option<String>,
    identifier_key: Option<String>,
    unknown_key: Option<String>,
    implicit_key: Option<String>,
    partition: Option<Partition>,
    hierarchy: Option<HierarchySpec>,
    root: Option<RootSpec>,
}

impl Topology {
    /// Start building a topology.
    pub fn build() -> TopologyBuilder {
        TopologyBuilder::default()
    }

    /// Check whether a key is a declared data property.
    pub fn is_data_property_key(&self, key: &str) -> bool {
        self.data_properties.contains_key(key)
    }

    /// Check whether a key is a declared object (reference) property.
    pub fn is_object_property_key(&self, key: &str) -> bool {
        self.object_properties.contains_key(key)
    }

    /// Check whether a key is one of the reserved internal keys.
    pub fn is_reserved_key(&self, key: &str) -> bool {
        let eq = |k: &Option<String>| k.as_deref() == Some(key);
        eq(&self.identifier_key)
            || eq(&self.unknown_key)
            || eq(&self.implicit_key)
            || self.partition.as_ref().map(|p| p.key.as_str()) == Some(key)
    }

    /// Check whether a key is multi-valued.
    pub fn is_multi_value_key(&self, key: &str) -> bool {
        self.multi_value_keys.contains(key)
    }

    /// Check whether a label denotes an embedded class.
    pub fn is_embedded_label(&self, label: &str) -> bool {
        self.embedded_classes.contains(label)
    }

    /// Iterate the declared class labels.
    pub fn class_labels(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn metadata_label(&self) -> Option<&str> {
        self.metadata_label.as_deref()
    }

    pub fn root_label(&self) -> Option<&str> {
        self.root_label.as_deref()
    }

    pub fn identifier_key(&self) -> Option<&str> {
        self.identifier_key.as_deref()
    }

    pub fn unknown_key(&self) -> Option<&str> {
        self.unknown_key.as_deref()
    }

    pub fn implicit_key(&self) -> Option<&str> {
        self.implicit_key.as_deref()
    }

    pub fn partition(&self) -> Option<&Partition> {
        self.partition.as_ref()
    }

    pub fn hierarchy(&self) -> Option<&HierarchySpec> {
        self.hierarchy.as_ref()
    }

    pub fn root(&self) -> Option<&RootSpec> {
        self.root.as_ref()
    }
}

/// Builder for [`Topology`]. All declared names are validated in
/// [`TopologyBuilder::build`]; the resulting topology is immutable.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    classes: BTreeMap<String, String>,
    embedded_classes: BTreeSet<String>,
    data_properties: BTreeMap<String, String>,
    multi_value_keys: BTreeSet<String>,
    object_properties: BTreeMap<String, String>,
    metadata_label: Option<String>,
    root_label: Option<String>,
    identifier_key: Option<String>,
    unknown_key: Option<String>,
    implicit_key: Option<String>,
    partition: Option<Partition>,
    hierarchy: Option<HierarchySpec>,
    root: Option<RootSpec>,
}

impl TopologyBuilder {
    pub fn class(mut self, label: impl Into<String>, iri: impl Into<String>) -> Self {
        self.classes.insert(label.into(), iri.into());
        self
    }

    pub fn embedded_class(mut self, label: impl Into<String>, iri: impl Into<String>) -> Self {
        let label = label.into();
        self.embedded_classes.insert(label.clone());
        self.classes.insert(label, iri.into());
        self
    }

    pub fn data_property(mut self, key: impl Into<String>, iri: impl Into<String>) -> Self {
        self.data_properties.insert(key.into(), iri.into());
        self
    }

    pub fn multi_value_data_property(
        mut self,
        key: impl Into<String>,
        iri: impl Into<String>,
    ) -> Self {
        let key = key.into();
        self.multi_value_keys.insert(key.clone());
        self.data_properties.insert(key, iri.into());
        self
    }

    pub fn object_property(mut self, key: impl Into<String>, iri: impl Into<String>) -> Self {
        self.object_properties.insert(key.into(), iri.into());
        self
    }

    pub fn metadata_label(mut self, label: impl Into<String>) -> Self {
        self.metadata_label = Some(label.into());
        self
    }

    pub fn root_label(mut self, label: impl Into<String>) -> Self {
        self.root_label = Some(label.into());
        self
    }

    pub fn identifier_key(mut self, key: impl Into<String>) -> Self {
        self.identifier_key = Some(key.into());
        self
    }

    pub fn unknown_key(mut self, key: impl Into<String>) -> Self {
        self.unknown_key = Some(key.into());
        self
    }

    pub fn implicit_key(mut self, key: impl Into<String>) -> Self {
        self.implicit_key = Some(key.into());
        self
    }

    pub fn partition(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.partition = Some(Partition {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn hierarchy(mut self, spec: HierarchySpec) -> Self {
        self.hierarchy = Some(spec);
        self
    }

    pub fn root(mut self, spec: RootSpec) -> Self {
        self.root = Some(spec);
        self
    }

    /// Validate and freeze the topology.
    pub fn build(self) -> Result<Topology, TopologyError> {
        if self.root_label.is_some() && self.metadata_label.is_none() {
            return Err(TopologyError::RootWithoutMetadata);
        }

        // Declared keys must not use the unknown-property namespace.
        for key in self.data_properties.keys().chain(self.object_properties.keys()) {
            if key.contains(':') {
                return Err(TopologyError::InvalidKey(key.clone()));
            }
        }

        // Reserved labels must not collide with declared names
        // (case-insensitively).
        if let Some(label) = &self.metadata_label {
            if label.contains(':') {
                return Err(TopologyError::InvalidKey(label.clone()));
            }
            if self.classes.keys().any(|c| c.eq_ignore_ascii_case(label)) {
                return Err(TopologyError::ReservedConflict {
                    name: label.clone(),
                    kind: "class label",
                });
            }
        }
        if let Some(label) = &self.root_label {
            if label.contains(':') {
                return Err(TopologyError::InvalidKey(label.clone()));
            }
            if self
                .object_properties
                .keys()
                .any(|k| k.eq_ignore_ascii_case(label))
            {
                return Err(TopologyError::ReservedConflict {
                    name: label.clone(),
                    kind: "object property",
                });
            }
        }

        // Reserved property keys must not collide with declared data
        // properties (case-insensitively).
        let partition_key = self.partition.as_ref().map(|p| p.key.clone());
        for key in [
            &self.identifier_key,
            &self.unknown_key,
            &self.implicit_key,
            &partition_key,
        ]
        .into_iter()
        .flatten()
        {
            if key.contains(':') {
                return Err(TopologyError::InvalidKey(key.clone()));
            }
            if self
                .data_properties
                .keys()
                .any(|k| k.eq_ignore_ascii_case(key))
            {
                return Err(TopologyError::ReservedConflict {
                    name: key.clone(),
                    kind: "data property",
                });
            }
        }

        Ok(Topology {
            classes: self.classes,
            embedded_classes: self.embedded_classes,
            data_properties: self.data_properties,
            multi_value_keys: self.multi_value_keys,
            object_properties: self.object_properties,
            metadata_label: self.metadata_label,
            root_label: self.root_label,
            identifier_key: self.identifier_key,
            unknown_key: self.unknown_key,
            implicit_key: self.implicit_key,
            partition: self.partition,
            hierarchy: self.hierarchy,
            root: self.root,
        })
    }
}

/// On-disk (TOML) form of a topology.
///
/// # Example
///
/// ```toml
/// identifier_key = "_id"
/// unknown_key = "_unknown"
/// implicit_key = "_implicit"
/// metadata_label = "Metadata"
/// root_label = "rootObject"
///
/// [classes]
/// File = "https://example.com/ns#File"
/// Project = "https://example.com/ns#Project"
///
/// [embedded_classes]
/// Note = "https://example.com/ns#Note"
///
/// [data_properties]
/// path = "https://example.com/ns#path"
///
/// [multi_value_data_properties]
/// tag = "https://example.com/ns#tag"
///
/// [object_properties]
/// parent = "https://example.com/ns#parent"
///
/// [hierarchy]
/// label = "File"
/// path_key = "path"
/// parent_edge_label = "parent"
/// root_paths = ["/"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyFile {
    pub classes: BTreeMap<String, String>,
    pub embedded_classes: BTreeMap<String, String>,
    pub data_properties: BTreeMap<String, String>,
    pub multi_value_data_properties: BTreeMap<String, String>,
    pub object_properties: BTreeMap<String, String>,
    pub metadata_label: Option<String>,
    pub root_label: Option<String>,
    pub identifier_key: Option<String>,
    pub unknown_key: Option<String>,
    pub implicit_key: Option<String>,
    pub hierarchy: Option<HierarchySpec>,
    pub root: Option<RootSpec>,
}

impl TopologyFile {
    /// Load a topology file from disk.
    pub fn load(path: &std::path::Path) -> Result<Self, TopologyError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Build the validated topology, optionally with a partition.
    pub fn into_topology(self, partition: Option<Partition>) -> Result<Topology, TopologyError> {
        let mut builder = Topology::build();
        for (label, iri) in self.classes {
            builder = builder.class(label, iri);
        }
        for (label, iri) in self.embedded_classes {
            builder = builder.embedded_class(label, iri);
        }
        for (key, iri) in self.data_properties {
            builder = builder.data_property(key, iri);
        }
        for (key, iri) in self.multi_value_data_properties {
            builder = builder.multi_value_data_property(key, iri);
        }
        for (key, iri) in self.object_properties {
            builder = builder.object_property(key, iri);
        }
        if let Some(label) = self.metadata_label {
            builder = builder.metadata_label(label);
        }
        if let Some(label) = self.root_label {
            builder = builder.root_label(label);
        }
        if let Some(key) = self.identifier_key {
            builder = builder.identifier_key(key);
        }
        if let Some(key) = self.unknown_key {
            builder = builder.unknown_key(key);
        }
        if let Some(key) = self.implicit_key {
            builder = builder.implicit_key(key);
        }
        if let Some(spec) = self.hierarchy {
            builder = builder.hierarchy(spec);
        }
        if let Some(spec) = self.root {
            builder = builder.root(spec);
        }
        if let Some(partition) = partition {
            builder = builder.partition(partition.key, partition.value);
        }
        builder.build()
    }
}
