//! Partition isolation: the same document imported under two
//! partition values must never share vertices or edges.

mod common;

use pretty_assertions::assert_eq;

use graphlode_engine::{import_nodes, ExportPipeline, ImportContext, Strategy, UID_SEPARATOR};
use graphlode_model::{Node, Partition, Value};
use graphlode_store::{GraphStore, MemoryStore, SqliteStore};

fn partitioned_topology(value: &str) -> graphlode_model::Topology {
    common::base_topology()
        .partition("_partition", value)
        .build()
        .unwrap()
}

fn document() -> Vec<Node> {
    vec![
        Node::new("urn:a", "File")
            .with_property("path", "/a")
            .with_reference("parent", "urn:p"),
        Node::new("urn:p", "Project"),
    ]
}

fn assert_isolated(store: &dyn GraphStore) {
    assert_eq!(store.vertex_count().unwrap(), 4);
    assert_eq!(store.edge_count().unwrap(), 2);

    // every edge stays within one partition
    for record in store.vertices_with_label("File").unwrap() {
        let partition = record.uid.split(UID_SEPARATOR).nth(1).unwrap().to_string();
        for edge in store.out_edges(record.id).unwrap() {
            let target = store.vertex(edge.target).unwrap();
            let target_partition = target.uid.split(UID_SEPARATOR).nth(1).unwrap();
            assert_eq!(target_partition, partition);
        }
    }
}

#[test]
fn test_partition_isolation_columnar() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    for run in ["run-1", "run-2"] {
        let ctx = ImportContext::new(partitioned_topology(run));
        import_nodes(&mut store, &ctx, document()).unwrap();
    }
    assert_isolated(&store);
}

#[test]
fn test_partition_isolation_native() {
    let mut store = MemoryStore::new();
    for run in ["run-1", "run-2"] {
        let ctx = ImportContext::new(partitioned_topology(run));
        import_nodes(&mut store, &ctx, document()).unwrap();
    }
    assert_isolated(&store);
}

#[test]
fn test_partition_stamped_on_vertices_and_edges() {
    let mut store = MemoryStore::new();
    let ctx = ImportContext::new(partitioned_topology("run-1")).with_strategy(Strategy::Generic);
    import_nodes(&mut store, &ctx, document()).unwrap();

    for record in store.vertices_with_label("File").unwrap() {
        assert_eq!(
            record.properties["_partition"],
            vec![Value::from("run-1")]
        );
        for edge in store.out_edges(record.id).unwrap() {
            assert_eq!(edge.properties["_partition"], vec![Value::from("run-1")]);
        }
    }
}

#[test]
fn test_partitioned_export_recovers_raw_ids() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let ctx = ImportContext::new(partitioned_topology("run-1"));
    import_nodes(&mut store, &ctx, document()).unwrap();

    let mut output = ExportPipeline::new(&store, &ctx).export().unwrap();
    output.sort_by(|l, r| l.id.cmp(&r.id));
    let ids: Vec<&str> = output.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["urn:a", "urn:p"]);
    assert!(!output[0].properties.contains_key("_partition"));
}

#[test]
fn test_topology_partition_from_file_form() {
    // partition is injected at load time, not written in the file
    let file: graphlode_model::TopologyFile = toml::from_str(
        r#"
        identifier_key = "_id"

        [classes]
        File = "x:File"

        [data_properties]
        path = "x:path"
        "#,
    )
    .unwrap();
    let topology = file
        .into_topology(Some(Partition {
            key: "_partition".to_string(),
            value: "run-9".to_string(),
        }))
        .unwrap();
    assert_eq!(topology.partition().unwrap().value, "run-9");
}
