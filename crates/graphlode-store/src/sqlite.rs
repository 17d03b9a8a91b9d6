//! SQLite-backed columnar store.
//!
//! The bulk-friendly backend: explicit transactions, uniform-schema
//! streaming inserts, and edge creation as a single INSERT..SELECT
//! that joins both endpoints on the uid column. A uid that misses the
//! join simply produces no row, which is what absorbs resolver false
//! positives.

use std::path::Path;

use rusqlite::{params, Connection};
use tracing::debug;

use graphlode_model::Value;

use crate::error::StoreError;
use crate::schema;
use crate::traits::GraphStore;
use crate::types::{
    ColumnarRow, EdgeId, EdgeRecord, PropertyMap, StoreCapabilities, VertexId, VertexRecord,
};

/// Graph store on a single SQLite database.
pub struct SqliteStore {
    conn: Connection,
    in_tx: bool,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::init(conn)
    }

    /// Open a transient in-memory store (tests, dry runs).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(schema::SCHEMA_CREATE_VERTICES)?;
        conn.execute_batch(schema::SCHEMA_CREATE_EDGES)?;
        conn.execute_batch(schema::SCHEMA_CREATE_META)?;
        conn.execute_batch(schema::SCHEMA_CREATE_INDEXES)?;
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?1)",
            params![schema::STORE_SCHEMA_VERSION],
        )?;
        Ok(Self { conn, in_tx: false })
    }

    fn vertex_rows(
        &self,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<VertexRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut records = Vec::new();
        for row in rows {
            let (id, label, uid, props) = row?;
            records.push(VertexRecord {
                id: id as VertexId,
                label,
                uid,
                properties: serde_json::from_str(&props)?,
            });
        }
        Ok(records)
    }

    fn edge_rows(
        &self,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<EdgeRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut records = Vec::new();
        for row in rows {
            let (id, label, source, target, props) = row?;
            records.push(EdgeRecord {
                id: id as EdgeId,
                label,
                source: source as VertexId,
                target: target as VertexId,
                properties: serde_json::from_str(&props)?,
            });
        }
        Ok(records)
    }

    fn vertex_exists(&self, id: VertexId) -> Result<(), StoreError> {
        let found: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM vertices WHERE id = ?1)",
            params![id as i64],
            |row| row.get(0),
        )?;
        if found {
            Ok(())
        } else {
            Err(StoreError::VertexNotFound(id))
        }
    }
}

impl GraphStore for SqliteStore {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            keyed_lookup: true,
            bulk_columnar: true,
            transactions: true,
        }
    }

    fn add_vertex(
        &mut self,
        label: &str,
        uid: &str,
        properties: PropertyMap,
    ) -> Result<VertexId, StoreError> {
        let props = serde_json::to_string(&properties)?;
        self.conn.execute(
            "INSERT INTO vertices (label, uid, props) VALUES (?1, ?2, ?3)",
            params![label, uid, props],
        )?;
        Ok(self.conn.last_insert_rowid() as VertexId)
    }

    fn vertex(&self, id: VertexId) -> Result<VertexRecord, StoreError> {
        self.vertex_rows(
            "SELECT id, label, uid, props FROM vertices WHERE id = ?1",
            &[&(id as i64)],
        )?
        .pop()
        .ok_or(StoreError::VertexNotFound(id))
    }

    fn vertex_by_uid(&self, uid: &str) -> Result<Option<VertexRecord>, StoreError> {
        Ok(self
            .vertex_rows(
                "SELECT id, label, uid, props FROM vertices WHERE uid = ?1 ORDER BY id LIMIT 1",
                &[&uid],
            )?
            .pop())
    }

    fn vertices_with_label(&self, label: &str) -> Result<Vec<VertexRecord>, StoreError> {
        self.vertex_rows(
            "SELECT id, label, uid, props FROM vertices WHERE label = ?1 ORDER BY id",
            &[&label],
        )
    }

    fn find_vertices(
        &self,
        label: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<VertexRecord>, StoreError> {
        // Property filter runs client side; props is an opaque JSON
        // column by design.
        Ok(self
            .vertices_with_label(label)?
            .into_iter()
            .filter(|record| {
                record
                    .properties
                    .get(key)
                    .is_some_and(|values| values.contains(value))
            })
            .collect())
    }

    fn merge_vertex_properties(
        &mut self,
        id: VertexId,
        properties: PropertyMap,
    ) -> Result<(), StoreError> {
        let mut merged = self.vertex(id)?.properties;
        merged.extend(properties);
        let props = serde_json::to_string(&merged)?;
        self.conn.execute(
            "UPDATE vertices SET props = ?1 WHERE id = ?2",
            params![props, id as i64],
        )?;
        Ok(())
    }

    fn remove_vertex(&mut self, id: VertexId) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM edges WHERE source = ?1 OR target = ?1",
            params![id as i64],
        )?;
        let removed = self
            .conn
            .execute("DELETE FROM vertices WHERE id = ?1", params![id as i64])?;
        if removed == 0 {
            return Err(StoreError::VertexNotFound(id));
        }
        Ok(())
    }

    fn add_edge(
        &mut self,
        label: &str,
        source: VertexId,
        target: VertexId,
        properties: PropertyMap,
    ) -> Result<EdgeId, StoreError> {
        self.vertex_exists(source)?;
        self.vertex_exists(target)?;
        let props = serde_json::to_string(&properties)?;
        self.conn.execute(
            "INSERT INTO edges (label, source, target, props) VALUES (?1, ?2, ?3, ?4)",
            params![label, source as i64, target as i64, props],
        )?;
        Ok(self.conn.last_insert_rowid() as EdgeId)
    }

    fn out_edges(&self, id: VertexId) -> Result<Vec<EdgeRecord>, StoreError> {
        self.vertex_exists(id)?;
        self.edge_rows(
            "SELECT id, label, source, target, props FROM edges WHERE source = ?1 ORDER BY id",
            &[&(id as i64)],
        )
    }

    fn in_edges(&self, id: VertexId) -> Result<Vec<EdgeRecord>, StoreError> {
        self.vertex_exists(id)?;
        self.edge_rows(
            "SELECT id, label, source, target, props FROM edges WHERE target = ?1 ORDER BY id",
            &[&(id as i64)],
        )
    }

    fn labels(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT label FROM vertices ORDER BY label")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn vertex_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM vertices", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn edge_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        if !self.in_tx {
            self.conn.execute_batch("BEGIN")?;
            self.in_tx = true;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if !self.in_tx {
            return Err(StoreError::NoTransaction);
        }
        self.conn.execute_batch("COMMIT")?;
        self.in_tx = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if !self.in_tx {
            return Err(StoreError::NoTransaction);
        }
        self.conn.execute_batch("ROLLBACK")?;
        self.in_tx = false;
        Ok(())
    }

    fn start_batch(&mut self) -> Result<(), StoreError> {
        self.begin()
    }

    fn stream_vertices(
        &mut self,
        label: &str,
        columns: &[String],
        rows: Vec<ColumnarRow>,
    ) -> Result<usize, StoreError> {
        let count = rows.len();
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO vertices (label, uid, props) VALUES (?1, ?2, ?3)")?;
        for row in rows {
            let properties: PropertyMap = columns
                .iter()
                .zip(row.values)
                .filter_map(|(column, values)| Some((column.clone(), values?)))
                .collect();
            let props = serde_json::to_string(&properties)?;
            stmt.execute(params![label, row.uid, props])?;
        }
        debug!(label, count, "streamed vertex batch");
        Ok(count)
    }

    fn bulk_add_edges(
        &mut self,
        edge_label: &str,
        source_label: &str,
        target_label: &str,
        pairs: &[(String, String)],
        properties: &PropertyMap,
    ) -> Result<usize, StoreError> {
        if pairs.is_empty() {
            return Ok(0);
        }
        self.conn.execute_batch(schema::SCHEMA_CREATE_PENDING_PAIRS)?;
        self.conn.execute("DELETE FROM pending_pairs", [])?;
        {
            let mut stmt = self
                .conn
                .prepare_cached("INSERT INTO pending_pairs (source_uid, target_uid) VALUES (?1, ?2)")?;
            for (source_uid, target_uid) in pairs {
                stmt.execute(params![source_uid, target_uid])?;
            }
        }
        let props = serde_json::to_string(properties)?;
        let created = self.conn.execute(
            r#"
            INSERT INTO edges (label, source, target, props)
            SELECT DISTINCT ?1, s.id, t.id, ?2
            FROM pending_pairs p
            JOIN vertices s ON s.label = ?3 AND s.uid = p.source_uid
            JOIN vertices t ON t.label = ?4 AND t.uid = p.target_uid
            WHERE NOT EXISTS (
                SELECT 1 FROM edges e
                WHERE e.label = ?1 AND e.source = s.id AND e.target = t.id
            )
            "#,
            params![edge_label, props, source_label, target_label],
        )?;
        debug!(
            edge_label,
            source_label,
            target_label,
            pairs = pairs.len(),
            created,
            "bulk edge join"
        );
        Ok(created)
    }

    fn collapse_duplicate_vertices(&mut self, label: &str) -> Result<usize, StoreError> {
        let duplicates: Vec<String> = {
            let mut stmt = self.conn.prepare(
                "SELECT uid FROM vertices WHERE label = ?1 GROUP BY uid HAVING COUNT(*) > 1",
            )?;
            let rows = stmt.query_map(params![label], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<_, _>>()?
        };

        let mut removed = 0;
        for uid in &duplicates {
            let rows: Vec<(i64, String)> = {
                let mut stmt = self.conn.prepare_cached(
                    "SELECT id, props FROM vertices WHERE label = ?1 AND uid = ?2 ORDER BY id",
                )?;
                let rows =
                    stmt.query_map(params![label, uid], |row| Ok((row.get(0)?, row.get(1)?)))?;
                rows.collect::<Result<_, _>>()?
            };

            // Later rows win key by key.
            let mut merged = PropertyMap::new();
            for (_, props) in &rows {
                let properties: PropertyMap = serde_json::from_str(props)?;
                merged.extend(properties);
            }

            let keep = rows[0].0;
            let props = serde_json::to_string(&merged)?;
            self.conn.execute(
                "UPDATE vertices SET props = ?1 WHERE id = ?2",
                params![props, keep],
            )?;
            removed += self.conn.execute(
                "DELETE FROM vertices WHERE label = ?1 AND uid = ?2 AND id > ?3",
                params![label, uid, keep],
            )?;
        }
        if removed > 0 {
            debug!(label, removed, "collapsed duplicate vertices");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlode_model::Value;
    use pretty_assertions::assert_eq;

    fn props(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), vec![Value::from(*v)]))
            .collect()
    }

    #[test]
    fn test_vertex_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .add_vertex("File", "urn:a", props(&[("path", "/a")]))
            .unwrap();

        let record = store.vertex(id).unwrap();
        assert_eq!(record.label, "File");
        assert_eq!(record.properties["path"], vec![Value::from("/a")]);

        let by_uid = store.vertex_by_uid("urn:a").unwrap().unwrap();
        assert_eq!(by_uid.id, id);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.add_vertex("File", "urn:a", PropertyMap::new()).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.vertex_count().unwrap(), 1);
    }

    #[test]
    fn test_transaction_rollback() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.begin().unwrap();
        store.add_vertex("File", "urn:a", PropertyMap::new()).unwrap();
        store.rollback().unwrap();
        assert_eq!(store.vertex_count().unwrap(), 0);

        assert!(matches!(store.commit(), Err(StoreError::NoTransaction)));
    }

    #[test]
    fn test_stream_vertices_pads_missing_columns() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let columns = vec!["path".to_string(), "name".to_string()];
        let rows = vec![
            ColumnarRow {
                uid: "urn:a".into(),
                values: vec![Some(vec![Value::from("/a")]), Some(vec![Value::from("a")])],
            },
            ColumnarRow {
                uid: "urn:b".into(),
                values: vec![Some(vec![Value::from("/b")]), None],
            },
        ];
        assert_eq!(store.stream_vertices("File", &columns, rows).unwrap(), 2);

        let b = store.vertex_by_uid("urn:b").unwrap().unwrap();
        assert_eq!(b.properties.len(), 1);
        assert!(!b.properties.contains_key("name"));
    }

    #[test]
    fn test_bulk_add_edges_joins_on_uid() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.add_vertex("File", "urn:a", PropertyMap::new()).unwrap();
        store.add_vertex("File", "urn:b", PropertyMap::new()).unwrap();

        let pairs = vec![
            ("urn:a".to_string(), "urn:b".to_string()),
            // join miss: no such target, silently dropped
            ("urn:a".to_string(), "urn:missing".to_string()),
        ];
        let created = store
            .bulk_add_edges("parent", "File", "File", &pairs, &PropertyMap::new())
            .unwrap();
        assert_eq!(created, 1);
        assert_eq!(store.edge_count().unwrap(), 1);

        // Re-running creates nothing new.
        let created = store
            .bulk_add_edges("parent", "File", "File", &pairs, &PropertyMap::new())
            .unwrap();
        assert_eq!(created, 0);
    }

    #[test]
    fn test_bulk_add_edges_dedupes_repeated_pairs() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.add_vertex("File", "urn:a", PropertyMap::new()).unwrap();
        store.add_vertex("File", "urn:b", PropertyMap::new()).unwrap();

        let pairs = vec![
            ("urn:a".to_string(), "urn:b".to_string()),
            ("urn:a".to_string(), "urn:b".to_string()),
        ];
        let created = store
            .bulk_add_edges("parent", "File", "File", &pairs, &PropertyMap::new())
            .unwrap();
        assert_eq!(created, 1);
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn test_bulk_add_edges_respects_labels() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.add_vertex("File", "urn:a", PropertyMap::new()).unwrap();
        store
            .add_vertex("Project", "urn:b", PropertyMap::new())
            .unwrap();

        let pairs = vec![("urn:a".to_string(), "urn:b".to_string())];
        // Wrong target label: the join must not match.
        let created = store
            .bulk_add_edges("parent", "File", "File", &pairs, &PropertyMap::new())
            .unwrap();
        assert_eq!(created, 0);
        let created = store
            .bulk_add_edges("parent", "File", "Project", &pairs, &PropertyMap::new())
            .unwrap();
        assert_eq!(created, 1);
    }

    #[test]
    fn test_collapse_duplicate_vertices() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .add_vertex("File", "urn:a", props(&[("path", "/a"), ("name", "old")]))
            .unwrap();
        store
            .add_vertex("File", "urn:a", props(&[("name", "new")]))
            .unwrap();
        store.add_vertex("File", "urn:b", PropertyMap::new()).unwrap();

        assert_eq!(store.collapse_duplicate_vertices("File").unwrap(), 1);
        assert_eq!(store.vertex_count().unwrap(), 2);

        let merged = store.vertex_by_uid("urn:a").unwrap().unwrap();
        assert_eq!(merged.properties["path"], vec![Value::from("/a")]);
        assert_eq!(merged.properties["name"], vec![Value::from("new")]);
    }

    #[test]
    fn test_remove_vertex_cascades_edges() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let a = store.add_vertex("File", "urn:a", PropertyMap::new()).unwrap();
        let b = store.add_vertex("File", "urn:b", PropertyMap::new()).unwrap();
        store.add_edge("parent", a, b, PropertyMap::new()).unwrap();

        store.remove_vertex(b).unwrap();
        assert_eq!(store.edge_count().unwrap(), 0);
        assert!(matches!(
            store.vertex(b),
            Err(StoreError::VertexNotFound(_))
        ));
    }
}
