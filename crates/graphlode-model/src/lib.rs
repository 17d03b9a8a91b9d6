//! Graphlode Model - Node records and topology configuration
//!
//! This crate defines the input data model for the import/export engine:
//!
//! - [`Node`]: a semi-structured graph record (identifier, type,
//!   list-valued properties, typed references to other nodes)
//! - [`Value`]: the scalar property value representation
//! - [`Topology`]: the immutable mapping of type and property names to
//!   store labels/columns, including reserved internal keys
//!
//! The topology is validated once at build time ([`TopologyBuilder`]);
//! the import pipeline relies on that and never re-checks reserved-key
//! invariants per node.

mod node;
mod topology;
mod unknown;
mod value;

pub use node::{Node, Reference};
pub use topology::{
    HierarchySpec, Partition, RootSpec, Topology, TopologyBuilder, TopologyError, TopologyFile,
};
pub use unknown::{preserve_unknown, restore_unknown};
pub use value::{Value, ValueList};

/// Result type for topology construction.
pub type Result<T> = std::result::Result<T, TopologyError>;
