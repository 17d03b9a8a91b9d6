//! SQLite schema definitions for the columnar store.
//!
//! Properties are stored as a JSON object per row (key to value list)
//! so the table shape never changes with the topology. The uid column
//! carries the caller-composed identifier and is the join key for the
//! bulk edge path.

/// Schema version recorded in `meta`
pub const STORE_SCHEMA_VERSION: &str = "1.0";

/// SQL to create the vertices table
pub const SCHEMA_CREATE_VERTICES: &str = r#"
CREATE TABLE IF NOT EXISTS vertices (
    -- Auto-incrementing backend id
    id INTEGER PRIMARY KEY AUTOINCREMENT,

    -- Vertex label
    label TEXT NOT NULL,

    -- Caller-composed unique identifier (raw id plus partition).
    -- Not UNIQUE: the streaming insert path may produce duplicate
    -- rows that are collapsed before edges are created.
    uid TEXT NOT NULL,

    -- Property map (JSON object, key -> value list)
    props TEXT NOT NULL
)
"#;

/// SQL to create the edges table
pub const SCHEMA_CREATE_EDGES: &str = r#"
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,

    -- Edge label
    label TEXT NOT NULL,

    -- Endpoint backend ids
    source INTEGER NOT NULL,
    target INTEGER NOT NULL,

    -- Property map (JSON object, key -> value list)
    props TEXT NOT NULL
)
"#;

/// SQL to create the metadata table
pub const SCHEMA_CREATE_META: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)
"#;

/// Indexes; the (label, uid) index drives the bulk edge join.
pub const SCHEMA_CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_vertices_label_uid ON vertices(label, uid);
CREATE INDEX IF NOT EXISTS idx_vertices_uid ON vertices(uid);
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target);
CREATE INDEX IF NOT EXISTS idx_edges_label ON edges(label)
"#;

/// Temp table loaded with uid pairs for the bulk edge join
pub const SCHEMA_CREATE_PENDING_PAIRS: &str = r#"
CREATE TEMP TABLE IF NOT EXISTS pending_pairs (
    source_uid TEXT NOT NULL,
    target_uid TEXT NOT NULL
)
"#;
