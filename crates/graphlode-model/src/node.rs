//! The semi-structured input record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueList};

/// A reference from one node to another.
///
/// Most references carry the target's identifier; embedded objects
/// (classes the topology marks as "embedded") arrive inline without a
/// usable identifier of their own and are carried as a full child node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    /// Reference by target identifier.
    Id(String),
    /// Inline embedded object (no identifier of its own).
    Embedded(Box<Node>),
}

impl Reference {
    /// Get the target identifier, if this is an id reference.
    pub fn id(&self) -> Option<&str> {
        match self {
            Reference::Id(id) => Some(id),
            Reference::Embedded(_) => None,
        }
    }
}

impl From<&str> for Reference {
    fn from(id: &str) -> Self {
        Reference::Id(id.to_string())
    }
}

/// A graph record flowing through the import/export pipeline.
///
/// Nodes are ephemeral: they exist only while being accumulated or
/// exported, never cached by the engine. A node with an unrecognized
/// type or unrecognized property keys is still round-trippable; unknown
/// keys are preserved through an opaque JSON side-channel (see
/// [`crate::preserve_unknown`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Caller-supplied opaque identifier, often URI-shaped. Empty on
    /// embedded nodes produced by export.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Type name selecting the topology mapping. `None` means the
    /// record carried no type; such nodes sort last in type-grouped
    /// input.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    /// Data properties, always list-valued.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, ValueList>,

    /// References to other nodes, keyed by object property name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, Vec<Reference>>,
}

impl Node {
    /// Create an empty node with an identifier and type.
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: Some(type_name.into()),
            properties: BTreeMap::new(),
            references: BTreeMap::new(),
        }
    }

    /// Create a node that carried no type.
    pub fn untyped(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: None,
            properties: BTreeMap::new(),
            references: BTreeMap::new(),
        }
    }

    /// Add a single-valued property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), vec![value.into()]);
        self
    }

    /// Add a multi-valued property.
    pub fn with_values(mut self, key: impl Into<String>, values: ValueList) -> Self {
        self.properties.insert(key.into(), values);
        self
    }

    /// Add an id reference.
    pub fn with_reference(mut self, key: impl Into<String>, target: impl Into<String>) -> Self {
        self.references
            .entry(key.into())
            .or_default()
            .push(Reference::Id(target.into()));
        self
    }

    /// Add an inline embedded object.
    pub fn with_embedded(mut self, key: impl Into<String>, child: Node) -> Self {
        self.references
            .entry(key.into())
            .or_default()
            .push(Reference::Embedded(Box::new(child)));
        self
    }

    /// Ordering key for type-grouped input: typed nodes sort by type
    /// name, untyped nodes sort last.
    pub fn type_order<'a>(&'a self) -> (bool, &'a str) {
        match &self.type_name {
            Some(t) => (false, t.as_str()),
            None => (true, ""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_json_round_trip() {
        let node = Node::new("urn:x:1", "Widget")
            .with_property("name", "sprocket")
            .with_values("tags", vec![Value::from("a"), Value::from("b")])
            .with_reference("partOf", "urn:x:2");

        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_reference_untagged_forms() {
        let id: Reference = serde_json::from_str("\"urn:x:2\"").unwrap();
        assert_eq!(id, Reference::Id("urn:x:2".to_string()));

        let embedded: Reference =
            serde_json::from_str(r#"{"type":"Note","properties":{"text":["hi"]}}"#).unwrap();
        match embedded {
            Reference::Embedded(node) => {
                assert_eq!(node.type_name.as_deref(), Some("Note"));
                assert!(node.id.is_empty());
            }
            Reference::Id(_) => panic!("expected embedded"),
        }
    }

    #[test]
    fn test_type_order_untyped_last() {
        let mut nodes = vec![
            Node::untyped("c"),
            Node::new("b", "Zeta"),
            Node::new("a", "Alpha"),
        ];
        nodes.sort_by(|l, r| l.type_order().cmp(&r.type_order()));
        assert_eq!(nodes[0].id, "a");
        assert_eq!(nodes[1].id, "b");
        assert_eq!(nodes[2].id, "c");
    }
}
