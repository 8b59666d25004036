//! One-shot import of a line-oriented JSON file into SQLite
//!
//! Guarded by the `migrated_from_jsonl` metadata flag, so re-running it
//! after success changes nothing.

use std::path::Path;
use rusqlite::params;
use crate::Result;
use super::schema::META_MIGRATED;
use super::{GraphStore, JsonlStore, SqliteStore};

/// Result of a migration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The flag was already set; nothing was touched
    AlreadyMigrated,
    /// The text file was imported
    Migrated { entities: usize, relations: usize },
}

impl std::fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationOutcome::AlreadyMigrated => write!(f, "already migrated, nothing to do"),
            MigrationOutcome::Migrated { entities, relations } => {
                write!(f, "migrated {} entities and {} relations", entities, relations)
            }
        }
    }
}

impl SqliteStore {
    /// Import the graph stored at `jsonl_path` unless that already happened.
    ///
    /// The graph is written with the same replace-all rules as `save_graph`,
    /// and the flag is set in the same transaction. A missing source file
    /// imports an empty graph and still marks the migration done.
    pub fn migrate_from_jsonl(&mut self, jsonl_path: &Path) -> Result<MigrationOutcome> {
        if self.is_migrated()? {
            tracing::debug!("Migration flag set, skipping {}", jsonl_path.display());
            return Ok(MigrationOutcome::AlreadyMigrated);
        }

        let graph = JsonlStore::new(jsonl_path).load_graph()?;
        graph.validate()?;

        let conn = self.connection()?;
        let tx = conn.transaction()?;
        let relations = Self::write_graph(&tx, &graph)?;
        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![META_MIGRATED, "true"],
        )?;
        tx.commit()?;

        let outcome = MigrationOutcome::Migrated {
            entities: graph.entities.len(),
            relations,
        };
        tracing::info!("Migration from {}: {}", jsonl_path.display(), outcome);
        Ok(outcome)
    }

    /// Whether the migration flag is set
    pub fn is_migrated(&mut self) -> Result<bool> {
        let conn = self.connection()?;
        Ok(Self::read_meta(conn, META_MIGRATED)?.as_deref() == Some("true"))
    }
}
