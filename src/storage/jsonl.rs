//! Line-oriented JSON storage
//!
//! File layout (UTF-8, newline separated):
//! ```text
//! {"type":"_aim","source":"mcp-knowledge-graph"}
//! {"type":"entity","name":"Alice","entityType":"person","observations":["likes tea"]}
//! {"type":"relation","from":"Alice","to":"Bob","relationType":"knows"}
//! ```

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use crate::graph::{Entity, KnowledgeGraph, Relation};
use crate::{Error, Result};
use super::{GraphStore, INVALID_MARKER, MARKER};

/// Tagged record as written after the marker line
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RecordRef<'a> {
    Entity(&'a Entity),
    Relation(&'a Relation),
}

/// Text-format backend over a single file
#[derive(Debug, Clone)]
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    /// Bind to a file path. No I/O happens until the first load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse file contents into a graph
    pub fn parse(contents: &str) -> Result<KnowledgeGraph> {
        let mut lines = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let marker_ok = match lines.next() {
            Some((_, first)) => serde_json::from_str::<Value>(first)
                .map(|value| MARKER.matches(&value))
                .unwrap_or(false),
            None => false,
        };
        if !marker_ok {
            return Err(Error::Format(INVALID_MARKER.to_string()));
        }

        let mut graph = KnowledgeGraph::new();
        for (idx, line) in lines {
            let line_no = idx + 1;
            let value: Value = serde_json::from_str(line)
                .map_err(|e| Error::Format(format!("line {}: {}", line_no, e)))?;

            match value.get("type").and_then(Value::as_str) {
                Some("entity") => {
                    let entity: Entity = serde_json::from_value(value)
                        .map_err(|e| Error::Format(format!("line {}: bad entity: {}", line_no, e)))?;
                    graph.entities.push(entity);
                }
                Some("relation") => {
                    let relation: Relation = serde_json::from_value(value).map_err(|e| {
                        Error::Format(format!("line {}: bad relation: {}", line_no, e))
                    })?;
                    graph.relations.push(relation);
                }
                other => {
                    tracing::debug!("Skipping record with type {:?} at line {}", other, line_no);
                }
            }
        }

        Ok(graph)
    }

    /// Render a graph as file contents: marker, entities, then relations
    pub fn render(graph: &KnowledgeGraph) -> Result<String> {
        let mut out = serde_json::to_string(&MARKER)
            .map_err(|e| Error::Format(format!("cannot encode marker: {}", e)))?;
        out.push('\n');

        let records = graph
            .entities
            .iter()
            .map(RecordRef::Entity)
            .chain(graph.relations.iter().map(RecordRef::Relation));

        for record in records {
            let line = serde_json::to_string(&record)
                .map_err(|e| Error::Format(format!("cannot encode record: {}", e)))?;
            out.push_str(&line);
            out.push('\n');
        }

        Ok(out)
    }
}

impl GraphStore for JsonlStore {
    fn load_graph(&mut self) -> Result<KnowledgeGraph> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No graph file at {}, starting empty", self.path.display());
                return Ok(KnowledgeGraph::new());
            }
            Err(e) => return Err(e.into()),
        };

        let graph = Self::parse(&contents)?;
        tracing::debug!(
            "Loaded {} entities and {} relations from {}",
            graph.entities.len(),
            graph.relations.len(),
            self.path.display()
        );
        Ok(graph)
    }

    fn save_graph(&mut self, graph: &KnowledgeGraph) -> Result<()> {
        graph.validate()?;
        let contents = Self::render(graph)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        // Write beside the target so the final rename stays on one filesystem
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        // Keep the existing file's mode instead of the temp file's 0600
        match fs::metadata(&self.path) {
            Ok(existing) => fs::set_permissions(tmp.path(), existing.permissions())?,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!(
            "Saved {} entities and {} relations to {}",
            graph.entities.len(),
            graph.relations.len(),
            self.path.display()
        );
        Ok(())
    }
}
