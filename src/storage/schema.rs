//! Database schema definitions

/// SQL to create the entities table
pub const CREATE_ENTITIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS entities (
    name TEXT PRIMARY KEY,
    entity_type TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the observations table
/// One row per (entity, observation); `id` order is insertion order
pub const CREATE_OBSERVATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_name TEXT NOT NULL REFERENCES entities(name) ON DELETE CASCADE,
    content TEXT NOT NULL
)
"#;

/// SQL to create the relations table
pub const CREATE_RELATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS relations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_entity TEXT NOT NULL REFERENCES entities(name) ON DELETE CASCADE,
    to_entity TEXT NOT NULL REFERENCES entities(name) ON DELETE CASCADE,
    relation_type TEXT NOT NULL,
    UNIQUE(from_entity, to_entity, relation_type)
)
"#;

/// SQL to create the metadata table
pub const CREATE_METADATA_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_observations_entity ON observations(entity_name)",
    "CREATE INDEX IF NOT EXISTS idx_relations_from ON relations(from_entity)",
    "CREATE INDEX IF NOT EXISTS idx_relations_to ON relations(to_entity)",
];

/// Metadata key holding the marker type tag
pub const META_TYPE: &str = "type";

/// Metadata key holding the marker source tag
pub const META_SOURCE: &str = "source";

/// Metadata key set once the text-format file has been imported
pub const META_MIGRATED: &str = "migrated_from_jsonl";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_ENTITIES_TABLE,
        CREATE_OBSERVATIONS_TABLE,
        CREATE_RELATIONS_TABLE,
        CREATE_METADATA_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
