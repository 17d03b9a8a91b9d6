//! Import/export round trips across the accumulation strategies.

mod common;

use pretty_assertions::assert_eq;

use graphlode_engine::{import_nodes, ExportPipeline, ImportContext, Strategy};
use graphlode_model::{Node, Value};
use graphlode_store::{GraphStore, MemoryStore, SqliteStore};

fn sample_nodes() -> Vec<Node> {
    vec![
        Node::new("urn:p", "Project").with_property("name", "proj"),
        Node::new("urn:a", "File")
            .with_property("path", "/a")
            .with_values("tags", vec![Value::from("x"), Value::from("y")])
            .with_property("ext:origin", "legacy")
            .with_reference("parent", "urn:p"),
        Node::new("urn:b", "File")
            .with_property("path", "/b")
            .with_reference("parent", "urn:a")
            .with_embedded("note", Node::new("", "Note").with_property("text", "hi")),
    ]
}

fn round_trip(store: &mut dyn GraphStore, ctx: &ImportContext, mut input: Vec<Node>) {
    import_nodes(store, ctx, input.clone()).unwrap();
    let mut output = ExportPipeline::new(store, ctx).export().unwrap();
    input.sort_by(|l, r| l.id.cmp(&r.id));
    output.sort_by(|l, r| l.id.cmp(&r.id));
    assert_eq!(output, input);
}

#[test]
fn test_round_trip_generic() {
    let mut store = MemoryStore::new();
    let ctx = ImportContext::new(common::topology()).with_strategy(Strategy::Generic);
    round_trip(&mut store, &ctx, sample_nodes());
}

#[test]
fn test_round_trip_native() {
    let mut store = MemoryStore::new();
    let ctx = ImportContext::new(common::topology()).with_strategy(Strategy::Native);
    round_trip(&mut store, &ctx, sample_nodes());
}

#[test]
fn test_round_trip_columnar() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let ctx = ImportContext::new(common::topology());
    round_trip(&mut store, &ctx, sample_nodes());
}

#[test]
fn test_untyped_node_round_trips() {
    // Untyped records survive a round trip on the non-columnar paths.
    let mut store = MemoryStore::new();
    let ctx = ImportContext::new(common::topology()).with_strategy(Strategy::Generic);
    round_trip(
        &mut store,
        &ctx,
        vec![
            Node::new("urn:a", "File").with_property("path", "/a"),
            Node::untyped("urn:odd").with_property("name", "odd"),
        ],
    );
}

#[test]
fn test_unknown_properties_survive() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let ctx = ImportContext::new(common::topology());
    let input = vec![Node::new("urn:a", "File")
        .with_property("ext:origin", "legacy")
        .with_values(
            "vendor:tags",
            vec![Value::from("x"), Value::Int(3)],
        )];
    import_nodes(&mut store, &ctx, input.clone()).unwrap();

    let output = ExportPipeline::new(&store, &ctx).export().unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_forward_references_across_strategies() {
    // References before their targets, including across types.
    let nodes = vec![
        Node::new("urn:a", "File").with_reference("parent", "urn:p"),
        Node::new("urn:b", "File").with_reference("parent", "urn:a"),
        Node::new("urn:p", "Project"),
    ];
    for strategy in [Strategy::Generic, Strategy::Native] {
        let mut store = MemoryStore::new();
        let ctx = ImportContext::new(common::topology()).with_strategy(strategy);
        import_nodes(&mut store, &ctx, nodes.clone()).unwrap();
        assert_eq!(store.vertex_count().unwrap(), 3, "{strategy:?}");
        assert_eq!(store.edge_count().unwrap(), 2, "{strategy:?}");
    }
    let mut store = SqliteStore::open_in_memory().unwrap();
    let ctx = ImportContext::new(common::topology());
    import_nodes(&mut store, &ctx, nodes).unwrap();
    assert_eq!(store.vertex_count().unwrap(), 3);
    assert_eq!(store.edge_count().unwrap(), 2);
}

#[test]
fn test_columnar_reimport_is_idempotent() {
    // Re-running the same import streams duplicate rows; the collapse
    // pass and the uid join must leave one vertex and one edge per
    // record, even when a reference is listed twice.
    let mut store = SqliteStore::open_in_memory().unwrap();
    let ctx = ImportContext::new(common::topology());
    let nodes = || {
        vec![
            Node::new("urn:a", "File")
                .with_property("path", "/a")
                .with_reference("parent", "urn:p")
                .with_reference("parent", "urn:p"),
            Node::new("urn:p", "Project"),
        ]
    };
    import_nodes(&mut store, &ctx, nodes()).unwrap();
    import_nodes(&mut store, &ctx, nodes()).unwrap();

    assert_eq!(store.vertex_count().unwrap(), 2);
    assert_eq!(store.edge_count().unwrap(), 1);
}

#[test]
fn test_dangling_reference_fails_every_strategy() {
    let nodes = vec![Node::new("urn:a", "File").with_reference("parent", "urn:gone")];
    for strategy in [Strategy::Generic, Strategy::Native] {
        let mut store = MemoryStore::new();
        let ctx = ImportContext::new(common::topology()).with_strategy(strategy);
        let err = import_nodes(&mut store, &ctx, nodes.clone()).unwrap_err();
        assert!(err.to_string().contains("urn:gone"), "{strategy:?}: {err}");
    }
    let mut store = SqliteStore::open_in_memory().unwrap();
    let ctx = ImportContext::new(common::topology());
    let err = import_nodes(&mut store, &ctx, nodes).unwrap_err();
    assert!(err.to_string().contains("urn:gone"), "{err}");
}

#[test]
fn test_embedded_child_inlined_without_id() {
    let mut store = MemoryStore::new();
    let ctx = ImportContext::new(common::topology()).with_strategy(Strategy::Native);
    import_nodes(
        &mut store,
        &ctx,
        vec![Node::new("urn:a", "File")
            .with_embedded("note", Node::new("", "Note").with_property("text", "hi"))],
    )
    .unwrap();

    let output = ExportPipeline::new(&store, &ctx).export().unwrap();
    assert_eq!(output.len(), 1);
    let child = match &output[0].references["note"][0] {
        graphlode_model::Reference::Embedded(child) => child,
        other => panic!("expected embedded child, got {other:?}"),
    };
    assert!(child.id.is_empty());
    assert_eq!(child.properties["text"], vec![Value::from("hi")]);
}
