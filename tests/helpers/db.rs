use std::sync::Arc;

use pariah::mapper::MapperRegistry;
use pariah::settings::{ConfigMap, Database, Mapping};
use pariah::storage::{MemoryStore, Row, SqlStore};
use serde_json::Value;
use tempfile::NamedTempFile;

/// Tables for every entity kind, with the foreign key columns component
/// loading expects.
pub const SCHEMA: &str = r#"
CREATE TABLE actions (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT);
CREATE TABLE roles (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, parent TEXT);
CREATE TABLE rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    permit INTEGER,
    role_ids TEXT,
    action_ids TEXT
);
CREATE TABLE resources (id INTEGER PRIMARY KEY AUTOINCREMENT, parent TEXT, rule_ids TEXT);
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent TEXT,
    username TEXT,
    password_hash TEXT,
    email TEXT,
    role_ids TEXT,
    rule_ids TEXT
);
CREATE TABLE blogs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent TEXT,
    title TEXT,
    rule_ids TEXT,
    user_id INTEGER
);
CREATE TABLE blog_articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent TEXT,
    title TEXT,
    body TEXT,
    teaser TEXT,
    created TEXT,
    date TEXT,
    rule_ids TEXT,
    user_id INTEGER,
    blog_id INTEGER
);
"#;

/// Mapper configuration covering every entity kind.
pub fn test_mapping() -> Mapping {
    Mapping::default()
        .with_model("Action", "table", ConfigMap::new())
        .with_model("Role", "table", ConfigMap::new())
        .with_model("Rule", "composite_table", ConfigMap::new())
        .with_model("Resource", "resource_table", ConfigMap::new())
        .with_model("User", "resource_table", ConfigMap::new())
        .with_model("Blog", "resource_table", ConfigMap::new())
        .with_model("BlogArticle", "resource_table", ConfigMap::new())
}

/// In-memory store plus a registry over it.
pub struct TestStore {
    store: Arc<MemoryStore>,
    registry: MapperRegistry,
}

impl TestStore {
    pub fn new() -> Self {
        Self::with_mapping(test_mapping())
    }

    pub fn with_mapping(mapping: Mapping) -> Self {
        let store = Arc::new(MemoryStore::new());
        let registry = MapperRegistry::new(store.clone(), mapping);
        Self { store, registry }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn registry(&self) -> &MapperRegistry {
        &self.registry
    }
}

/// SQLite database in a temporary file with the test schema applied
pub struct TestDb {
    store: Arc<SqlStore>,
    _temp_file: NamedTempFile,
}

impl TestDb {
    pub fn new() -> Self {
        // Create temporary SQLite database file
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_file.path().to_str().expect("Invalid temp file path");
        let url = format!("sqlite://{}?mode=rwc", db_path);

        let store = SqlStore::connect(&Database { url }).expect("Failed to connect to test database");
        store.execute_script(SCHEMA).expect("Failed to create tables");

        Self {
            store: Arc::new(store),
            _temp_file: temp_file,
        }
    }

    pub fn store(&self) -> &SqlStore {
        &self.store
    }

    pub fn registry(&self) -> MapperRegistry {
        MapperRegistry::new(self.store.clone(), test_mapping())
    }
}

/// Build a row from column/value pairs.
pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(column, value)| (column.to_string(), value.clone()))
        .collect()
}
