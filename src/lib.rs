//! # aim-memory - Knowledge Graph Storage
//!
//! Persists a small labeled graph (entities with free-text observations and
//! typed directed relations) to durable storage.
//!
//! aim-memory provides:
//! - An in-memory graph model exchanged whole on every load and save
//! - A line-oriented JSON backend guarded by a safety marker
//! - An embedded SQLite backend with foreign keys and transactional saves
//! - A one-shot, idempotent migration from the JSON file into SQLite
//! - A pure backend selector driven by configuration

pub mod graph;
pub mod storage;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use graph::{Entity, GraphStats, KnowledgeGraph, Relation};
pub use storage::{
    create_backend, Backend, GraphStore, JsonlStore, MigrationOutcome, SqliteStore, StorageKind,
};

/// Result type alias for aim-memory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for aim-memory operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Format error: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, ref message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::Constraint(message.clone().unwrap_or_else(|| failure.to_string()))
            }
            other => Error::Storage(other),
        }
    }
}
