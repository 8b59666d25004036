//! Backend selection
//!
//! Maps a configured storage kind and the text-format path to a concrete
//! backend. Construction does no I/O.

use std::path::{Path, PathBuf};
use crate::graph::KnowledgeGraph;
use crate::Result;
use super::{GraphStore, JsonlStore, MigrationOutcome, SqliteStore};

/// Extension of the relational store file
pub const SQLITE_EXTENSION: &str = "db";

/// Which backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    #[default]
    Jsonl,
    Sqlite,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Jsonl => "jsonl",
            StorageKind::Sqlite => "sqlite",
        }
    }

    /// Parse a configured value, case-insensitive.
    ///
    /// Anything unrecognized falls back to the default.
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "jsonl" => StorageKind::Jsonl,
            "sqlite" => StorageKind::Sqlite,
            other => {
                tracing::warn!("Unknown storage type {:?}, using {}", other, StorageKind::default());
                StorageKind::default()
            }
        }
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derive the database path from the text-format path
pub fn sqlite_path_for(jsonl_path: &Path) -> PathBuf {
    jsonl_path.with_extension(SQLITE_EXTENSION)
}

/// A constructed storage backend
#[derive(Debug)]
pub enum Backend {
    Jsonl(JsonlStore),
    Sqlite(SqliteStore),
}

impl Backend {
    pub fn kind(&self) -> StorageKind {
        match self {
            Backend::Jsonl(_) => StorageKind::Jsonl,
            Backend::Sqlite(_) => StorageKind::Sqlite,
        }
    }

    /// Where this backend reads and writes (None for in-memory SQLite)
    pub fn path(&self) -> Option<&Path> {
        match self {
            Backend::Jsonl(store) => Some(store.path()),
            Backend::Sqlite(store) => store.path(),
        }
    }

    /// Import a text-format file. Only the relational backend has anything
    /// to migrate into; the text backend returns `None`.
    pub fn migrate_from_jsonl(&mut self, jsonl_path: &Path) -> Result<Option<MigrationOutcome>> {
        match self {
            Backend::Jsonl(_) => Ok(None),
            Backend::Sqlite(store) => store.migrate_from_jsonl(jsonl_path).map(Some),
        }
    }
}

impl GraphStore for Backend {
    fn load_graph(&mut self) -> Result<KnowledgeGraph> {
        match self {
            Backend::Jsonl(store) => store.load_graph(),
            Backend::Sqlite(store) => store.load_graph(),
        }
    }

    fn save_graph(&mut self, graph: &KnowledgeGraph) -> Result<()> {
        match self {
            Backend::Jsonl(store) => store.save_graph(graph),
            Backend::Sqlite(store) => store.save_graph(graph),
        }
    }

    fn close(self) -> Result<()> {
        match self {
            Backend::Jsonl(store) => store.close(),
            Backend::Sqlite(store) => store.close(),
        }
    }
}

/// Construct the backend for `kind` bound to `jsonl_path`.
///
/// The relational backend uses `jsonl_path` with its extension replaced.
pub fn create_backend(jsonl_path: &Path, kind: StorageKind) -> Backend {
    match kind {
        StorageKind::Jsonl => Backend::Jsonl(JsonlStore::new(jsonl_path)),
        StorageKind::Sqlite => Backend::Sqlite(SqliteStore::new(sqlite_path_for(jsonl_path))),
    }
}
