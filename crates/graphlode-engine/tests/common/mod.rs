//! Shared fixtures for the engine integration tests.

use graphlode_model::{HierarchySpec, RootSpec, Topology, TopologyBuilder};

/// Topology used by most tests: files with parents, projects, embedded
/// notes, one multi-valued key, all reserved keys configured.
pub fn base_topology() -> TopologyBuilder {
    Topology::build()
        .class("File", "x:File")
        .class("Project", "x:Project")
        .embedded_class("Note", "x:Note")
        .data_property("path", "x:path")
        .data_property("name", "x:name")
        .data_property("text", "x:text")
        .multi_value_data_property("tags", "x:tags")
        .object_property("parent", "x:parent")
        .object_property("note", "x:note")
        .object_property("subproject", "x:subproject")
        .identifier_key("_id")
        .unknown_key("_unknown")
        .implicit_key("_implicit")
}

pub fn topology() -> Topology {
    base_topology().build().unwrap()
}

pub fn hierarchy_topology(root_paths: &[&str]) -> Topology {
    base_topology()
        .hierarchy(HierarchySpec {
            label: "File".to_string(),
            path_key: "path".to_string(),
            parent_edge_label: "parent".to_string(),
            root_paths: root_paths.iter().map(|p| p.to_string()).collect(),
            base_edge_label: None,
        })
        .build()
        .unwrap()
}

pub fn root_topology() -> Topology {
    base_topology()
        .metadata_label("Metadata")
        .root_label("rootObject")
        .root(RootSpec {
            label: "Project".to_string(),
            sub_edge_label: "subproject".to_string(),
        })
        .build()
        .unwrap()
}
