//! Knowledge Graph - the unit of exchange with storage
//!
//! A graph is read and written whole. Backends never expose partial reads
//! or incremental writes; every save replaces what was stored before.

use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// A named node with a type label and ordered free-text observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: String,
    pub entity_type: String,
    #[serde(default)]
    pub observations: Vec<String>,
}

impl Entity {
    /// Create an entity with no observations
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            observations: Vec::new(),
        }
    }

    /// Builder: append an observation
    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observations.push(observation.into());
        self
    }
}

/// A directed, typed edge between two entity names.
///
/// Identified by the `(from, to, relation_type)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub from: String,
    pub to: String,
    pub relation_type: String,
}

impl Relation {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
        }
    }
}

/// The full entity + relation collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

impl KnowledgeGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    /// Check the invariants a graph must hold before it is saved.
    ///
    /// Entity names must be non-empty and unique. Relations are not checked:
    /// whether an orphaned endpoint is acceptable is up to the backend.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.entities.len());
        for entity in &self.entities {
            if entity.name.is_empty() {
                return Err(Error::InvalidGraph("entity name must not be empty".to_string()));
            }
            if !seen.insert(entity.name.as_str()) {
                return Err(Error::InvalidGraph(format!(
                    "duplicate entity name: {}",
                    entity.name
                )));
            }
        }
        Ok(())
    }

    /// Get an entity by name
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Row counts for this graph
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            entities: self.entities.len(),
            observations: self.entities.iter().map(|e| e.observations.len()).sum(),
            relations: self.relations.len(),
        }
    }
}

/// Graph size summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub entities: usize,
    pub observations: usize,
    pub relations: usize,
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Graph Statistics:")?;
        writeln!(f, "  Entities: {}", self.entities)?;
        writeln!(f, "  Observations: {}", self.observations)?;
        writeln!(f, "  Relations: {}", self.relations)
    }
}
