//! Storage Layer - whole-graph persistence
//!
//! Two interchangeable backends:
//! - `JsonlStore`: one JSON object per line, led by a safety marker
//! - `SqliteStore`: entities(name, entity_type, created_at),
//!   observations(entity_name, content), relations(from_entity, to_entity, relation_type),
//!   metadata(key, value)

pub mod backend;
pub mod jsonl;
pub mod migrate;
pub mod schema;
pub mod sqlite;

pub use backend::{create_backend, sqlite_path_for, Backend, StorageKind};
pub use jsonl::JsonlStore;
pub use migrate::MigrationOutcome;
pub use sqlite::SqliteStore;

use serde::Serialize;
use crate::graph::KnowledgeGraph;
use crate::Result;

/// Load/save contract shared by every backend.
///
/// Each call operates on the complete graph. Callers serialize their own
/// load-mutate-save cycles; nothing here guards against interleaved writers.
pub trait GraphStore {
    /// Read the whole stored graph. A fresh value is built on every call.
    fn load_graph(&mut self) -> Result<KnowledgeGraph>;

    /// Replace the whole stored graph with `graph`.
    fn save_graph(&mut self, graph: &KnowledgeGraph) -> Result<()>;

    /// Release the underlying storage handle.
    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Fixed identity tags that mark storage as belonging to this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetyMarker {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub source: &'static str,
}

/// The marker written by both backends.
pub const MARKER: SafetyMarker = SafetyMarker {
    kind: "_aim",
    source: "mcp-knowledge-graph",
};

impl SafetyMarker {
    /// The marker as the JSON object stored on the first line of a text file
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "type": self.kind, "source": self.source })
    }

    /// Whether `value` is exactly this marker object
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        *value == self.to_json()
    }
}

pub(crate) const INVALID_MARKER: &str = "missing or invalid safety marker";
