//! SQLite storage implementation

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use rusqlite::{params, Connection, OptionalExtension};
use crate::graph::{Entity, GraphStats, KnowledgeGraph, Relation};
use crate::{Error, Result};
use super::schema::{self, META_SOURCE, META_TYPE};
use super::{GraphStore, INVALID_MARKER, MARKER};

/// Where the database lives
#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Connection lifecycle. Moves to `Ready` once, on first use.
#[derive(Debug)]
enum ConnState {
    Uninitialized,
    Ready(Connection),
}

/// SQLite-backed storage for the knowledge graph
#[derive(Debug)]
pub struct SqliteStore {
    location: Location,
    state: ConnState,
}

impl SqliteStore {
    /// Bind to a database file. The file is opened and the schema created
    /// lazily, before the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            state: ConnState::Uninitialized,
        }
    }

    /// Open a database file now (creates if doesn't exist)
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::new(path);
        store.connection()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let mut store = Self {
            location: Location::Memory,
            state: ConnState::Uninitialized,
        };
        store.connection()?;
        Ok(store)
    }

    /// Database file path (None for in-memory)
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    /// Whether the connection has been opened and the schema created
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ConnState::Ready(_))
    }

    /// Get the live connection, initializing on first use
    pub(super) fn connection(&mut self) -> Result<&mut Connection> {
        if let ConnState::Uninitialized = self.state {
            self.state = ConnState::Ready(open_connection(&self.location)?);
        }
        match &mut self.state {
            ConnState::Ready(conn) => Ok(conn),
            ConnState::Uninitialized => unreachable!("connection initialized above"),
        }
    }

    /// Replace every entity, observation and relation row with `graph`.
    ///
    /// Runs on the caller's transaction. Returns the number of relation rows
    /// actually stored after duplicate triples are dropped.
    pub(super) fn write_graph(conn: &Connection, graph: &KnowledgeGraph) -> Result<usize> {
        conn.execute("DELETE FROM relations", [])?;
        conn.execute("DELETE FROM observations", [])?;
        conn.execute("DELETE FROM entities", [])?;

        {
            let mut insert_entity =
                conn.prepare_cached("INSERT INTO entities (name, entity_type) VALUES (?1, ?2)")?;
            let mut insert_observation = conn.prepare_cached(
                "INSERT INTO observations (entity_name, content) VALUES (?1, ?2)",
            )?;

            for entity in &graph.entities {
                insert_entity.execute(params![entity.name, entity.entity_type])?;
            }
            for entity in &graph.entities {
                for observation in &entity.observations {
                    insert_observation.execute(params![entity.name, observation])?;
                }
            }
        }

        let mut stored = 0;
        let mut insert_relation = conn.prepare_cached(
            r#"
            INSERT OR IGNORE INTO relations (from_entity, to_entity, relation_type)
            VALUES (?1, ?2, ?3)
            "#,
        )?;
        for relation in &graph.relations {
            stored += insert_relation.execute(params![
                relation.from,
                relation.to,
                relation.relation_type,
            ])?;
        }

        Ok(stored)
    }

    /// Read a metadata value
    pub(super) fn read_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    /// Get database statistics
    pub fn stats(&mut self) -> Result<GraphStats> {
        let conn = self.connection()?;
        Ok(GraphStats {
            entities: count_rows(conn, "entities")?,
            observations: count_rows(conn, "observations")?,
            relations: count_rows(conn, "relations")?,
        })
    }
}

impl GraphStore for SqliteStore {
    fn load_graph(&mut self) -> Result<KnowledgeGraph> {
        let conn = self.connection()?;
        // One read transaction so all three queries see the same snapshot
        let tx = conn.transaction()?;

        let mut observations: HashMap<String, Vec<String>> = HashMap::new();
        let mut entities: Vec<Entity>;
        let relations: Vec<Relation>;
        {
            let mut stmt = tx.prepare("SELECT entity_name, content FROM observations ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (name, content) = row?;
                observations.entry(name).or_default().push(content);
            }

            let mut stmt = tx.prepare("SELECT name, entity_type FROM entities ORDER BY rowid")?;
            entities = stmt
                .query_map([], |row| {
                    Ok(Entity {
                        name: row.get(0)?,
                        entity_type: row.get(1)?,
                        observations: Vec::new(),
                    })
                })?
                .collect::<rusqlite::Result<_>>()?;

            let mut stmt = tx.prepare(
                "SELECT from_entity, to_entity, relation_type FROM relations ORDER BY id",
            )?;
            relations = stmt
                .query_map([], |row| {
                    Ok(Relation {
                        from: row.get(0)?,
                        to: row.get(1)?,
                        relation_type: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<_>>()?;
        }
        tx.commit()?;

        for entity in &mut entities {
            entity.observations = observations.remove(&entity.name).unwrap_or_default();
        }

        tracing::debug!(
            "Loaded {} entities and {} relations from SQLite",
            entities.len(),
            relations.len()
        );
        Ok(KnowledgeGraph { entities, relations })
    }

    fn save_graph(&mut self, graph: &KnowledgeGraph) -> Result<()> {
        graph.validate()?;
        let conn = self.connection()?;

        let tx = conn.transaction()?;
        let stored = Self::write_graph(&tx, graph)?;
        tx.commit()?;

        tracing::debug!(
            "Saved {} entities and {} relations to SQLite ({} duplicates dropped)",
            graph.entities.len(),
            stored,
            graph.relations.len() - stored
        );
        Ok(())
    }

    fn close(self) -> Result<()> {
        match self.state {
            ConnState::Uninitialized => Ok(()),
            ConnState::Ready(conn) => conn.close().map_err(|(_, e)| e.into()),
        }
    }
}

/// Open, configure and initialize a connection
fn open_connection(location: &Location) -> Result<Connection> {
    let mut conn = match location {
        Location::File(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Connection::open(path)?
        }
        Location::Memory => Connection::open_in_memory()?,
    };

    // Nothing below may write to a database that is not ours
    let fresh = check_identity(&conn)?;

    conn.pragma_update(None, "foreign_keys", true)?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    tracing::debug!("SQLite journal mode: {}", mode);

    let tx = conn.transaction()?;
    for stmt in schema::all_schema_statements() {
        tx.execute(stmt, [])?;
    }
    {
        let mut stamp =
            tx.prepare("INSERT OR IGNORE INTO metadata (key, value) VALUES (?1, ?2)")?;
        stamp.execute(params![META_TYPE, MARKER.kind])?;
        stamp.execute(params![META_SOURCE, MARKER.source])?;
    }
    tx.commit()?;

    if fresh {
        tracing::debug!("Initialized new knowledge graph database");
    }
    Ok(conn)
}

/// Read-only identity check, run before anything is written.
///
/// Returns `true` for an empty database. A non-empty database must already
/// carry both identity tags; anything else is refused.
fn check_identity(conn: &Connection) -> Result<bool> {
    let objects: i64 = conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get(0))?;
    if objects == 0 {
        return Ok(true);
    }

    let has_metadata: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'metadata')",
        [],
        |row| row.get(0),
    )?;
    if !has_metadata {
        return Err(Error::Format(INVALID_MARKER.to_string()));
    }

    let kind = SqliteStore::read_meta(conn, META_TYPE)?;
    let source = SqliteStore::read_meta(conn, META_SOURCE)?;
    if kind.as_deref() != Some(MARKER.kind) || source.as_deref() != Some(MARKER.source) {
        return Err(Error::Format(INVALID_MARKER.to_string()));
    }
    Ok(false)
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_graph() -> KnowledgeGraph {
        KnowledgeGraph {
            entities: vec![
                Entity::new("Alice", "person")
                    .with_observation("likes tea")
                    .with_observation("plays chess"),
                Entity::new("Bob", "person").with_observation("drives a bus"),
                Entity::new("Carol", "robot"),
            ],
            relations: vec![
                Relation::new("Alice", "Bob", "knows"),
                Relation::new("Bob", "Carol", "repairs"),
                Relation::new("Carol", "Alice", "serves"),
            ],
        }
    }

    #[test]
    fn test_alice_example() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let graph = KnowledgeGraph {
            entities: vec![Entity::new("Alice", "person").with_observation("likes tea")],
            relations: vec![],
        };
        store.save_graph(&graph).unwrap();

        let loaded = store.load_graph().unwrap();
        let alice = loaded.entity("Alice").unwrap();
        assert_eq!(alice.entity_type, "person");
        assert_eq!(alice.observations, vec!["likes tea"]);
    }

    #[test]
    fn test_roundtrip_on_fresh_handle_keeps_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.db");
        let graph = sample_graph();

        let mut store = SqliteStore::new(&path);
        store.save_graph(&graph).unwrap();
        store.close().unwrap();

        let mut fresh = SqliteStore::new(&path);
        assert_eq!(fresh.load_graph().unwrap(), graph);
    }

    #[test]
    fn test_lazy_initialization() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("memory.db");

        let mut store = SqliteStore::new(&path);
        assert!(!store.is_ready());
        assert!(!path.exists());

        assert!(store.load_graph().unwrap().is_empty());
        assert!(store.is_ready());
        assert!(path.exists());

        // A second operation reuses the open connection
        store.load_graph().unwrap();
        assert!(store.is_ready());
    }

    #[test]
    fn test_duplicate_relations_collapse() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let graph = KnowledgeGraph {
            entities: vec![Entity::new("A", "t"), Entity::new("B", "t")],
            relations: vec![
                Relation::new("A", "B", "likes"),
                Relation::new("A", "B", "likes"),
                Relation::new("A", "B", "follows"),
            ],
        };
        store.save_graph(&graph).unwrap();

        assert_eq!(store.stats().unwrap().relations, 2);
        let loaded = store.load_graph().unwrap();
        assert_eq!(
            loaded.relations,
            vec![Relation::new("A", "B", "likes"), Relation::new("A", "B", "follows")]
        );
    }

    #[test]
    fn test_save_replaces_previous_graph() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save_graph(&sample_graph()).unwrap();

        let replacement = KnowledgeGraph {
            entities: vec![Entity::new("Dora", "cat").with_observation("naps")],
            relations: vec![],
        };
        store.save_graph(&replacement).unwrap();

        assert_eq!(store.load_graph().unwrap(), replacement);
        let stats = store.stats().unwrap();
        assert_eq!((stats.entities, stats.observations, stats.relations), (1, 1, 0));
    }

    #[test]
    fn test_orphan_relation_aborts_whole_save() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save_graph(&sample_graph()).unwrap();

        let broken = KnowledgeGraph {
            entities: vec![Entity::new("Alice", "person")],
            relations: vec![Relation::new("Alice", "Ghost", "haunts")],
        };
        let err = store.save_graph(&broken).unwrap_err();
        assert!(matches!(err, Error::Constraint(_)), "unexpected error: {err:?}");

        assert_eq!(store.load_graph().unwrap(), sample_graph());
    }

    #[test]
    fn test_duplicate_entities_rejected_before_write() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save_graph(&sample_graph()).unwrap();

        let bad = KnowledgeGraph {
            entities: vec![Entity::new("X", "t"), Entity::new("X", "u")],
            relations: vec![],
        };
        assert!(matches!(store.save_graph(&bad), Err(Error::InvalidGraph(_))));
        assert_eq!(store.stats().unwrap().entities, 3);
    }

    #[test]
    fn test_delete_entity_cascades() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save_graph(&sample_graph()).unwrap();

        let conn = store.connection().unwrap();
        conn.execute("DELETE FROM entities WHERE name = ?1", ["Bob"]).unwrap();

        let loaded = store.load_graph().unwrap();
        assert!(loaded.entity("Bob").is_none());
        assert_eq!(loaded.relations, vec![Relation::new("Carol", "Alice", "serves")]);

        let stats = store.stats().unwrap();
        assert_eq!(stats.observations, 2);
        assert_eq!(stats.relations, 1);
    }

    #[test]
    fn test_identity_tags_written() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let conn = store.connection().unwrap();
        assert_eq!(
            SqliteStore::read_meta(conn, META_TYPE).unwrap().as_deref(),
            Some("_aim")
        );
        assert_eq!(
            SqliteStore::read_meta(conn, META_SOURCE).unwrap().as_deref(),
            Some("mcp-knowledge-graph")
        );
    }

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap()
    }

    fn journal_mode(conn: &Connection) -> String {
        conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_foreign_database_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL);
                 INSERT INTO metadata (key, value) VALUES ('source', 'another-app');",
            )
            .unwrap();
        }

        let mut store = SqliteStore::new(&path);
        assert!(matches!(store.load_graph(), Err(Error::Format(_))));
        assert!(!store.is_ready());

        let conn = Connection::open(&path).unwrap();
        assert_eq!(table_names(&conn), vec!["metadata"]);
        let rows: Vec<(String, String)> = conn
            .prepare("SELECT key, value FROM metadata ORDER BY key")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(rows, vec![("source".to_string(), "another-app".to_string())]);
        assert_eq!(journal_mode(&conn), "delete");
    }

    #[test]
    fn test_unrelated_database_left_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT);
                 INSERT INTO users (email) VALUES ('a@example.com');",
            )
            .unwrap();
        }

        let mut store = SqliteStore::new(&path);
        assert!(matches!(store.load_graph(), Err(Error::Format(_))));
        assert!(!store.is_ready());

        let conn = Connection::open(&path).unwrap();
        assert_eq!(table_names(&conn), vec!["users"]);
        assert_eq!(journal_mode(&conn), "delete");
    }

    #[test]
    fn test_reopen_own_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.db");
        SqliteStore::open(&path).unwrap().close().unwrap();

        let mut reopened = SqliteStore::new(&path);
        assert!(reopened.load_graph().unwrap().is_empty());
        let conn = reopened.connection().unwrap();
        assert_eq!(journal_mode(conn), "wal");
    }

    #[test]
    fn test_close_uninitialized_is_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never.db");
        SqliteStore::new(&path).close().unwrap();
        assert!(!path.exists());
    }
}
