use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::PariahError;
use crate::model::Value;

/// Free-form options for a mapper class or a model.
pub type ConfigMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub database: Database,
    #[serde(default)]
    pub authorization: Authorization,
    /// mapper class -> default options
    #[serde(default)]
    pub mappers: BTreeMap<String, ConfigMap>,
    /// entity type -> mapper class and options
    #[serde(default)]
    pub models: BTreeMap<String, ModelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    /// SeaORM connection string. Only SQLite is supported,
    /// e.g. sqlite://pariah.db?mode=rwc
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Authorization {
    /// Role attached to every logged-in user, if set.
    pub default_role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Mapper class tag, e.g. `composite_table`.
    pub mapper: String,
    #[serde(default)]
    pub config: ConfigMap,
}

/// The mapper/model layers consumed by the registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    pub mappers: BTreeMap<String, ConfigMap>,
    pub models: BTreeMap<String, ModelConfig>,
}

impl Mapping {
    /// Model configuration for an entity type. Key case is ignored because
    /// configuration sources may normalise it.
    pub fn model(&self, type_name: &str) -> Option<&ModelConfig> {
        self.models
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(type_name))
            .map(|(_, cfg)| cfg)
    }

    pub fn mapper_defaults(&self, class: &str) -> Option<&ConfigMap> {
        self.mappers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(class))
            .map(|(_, cfg)| cfg)
    }

    /// Register a model; handy when building configuration in code.
    pub fn with_model(mut self, type_name: &str, mapper: &str, config: ConfigMap) -> Self {
        self.models.insert(
            type_name.to_string(),
            ModelConfig {
                mapper: mapper.to_string(),
                config,
            },
        );
        self
    }

    pub fn with_mapper_defaults(mut self, class: &str, config: ConfigMap) -> Self {
        self.mappers.insert(class.to_string(), config);
        self
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: "sqlite://pariah.db?mode=rwc".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self, PariahError> {
        let mut builder = config::Config::builder()
            .set_default("database.url", Database::default().url)?
            .set_default("mappers.table.order", "id")?
            .set_default("mappers.composite_table.order", "id")?
            .set_default("mappers.resource_table.order", "id")?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: PARIAH__DATABASE__URL=..., etc.
        builder = builder.add_source(config::Environment::with_prefix("PARIAH").separator("__"));

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        tracing::debug!(
            models = settings.models.len(),
            mappers = settings.mappers.len(),
            "Parsed settings"
        );
        Ok(settings)
    }

    pub fn mapping(&self) -> Mapping {
        Mapping {
            mappers: self.mappers.clone(),
            models: self.models.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_settings_load_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nonexistent.toml");

        let settings = Settings::load(config_path.to_str().unwrap())
            .expect("Failed to load settings");

        assert_eq!(settings.database.url, "sqlite://pariah.db?mode=rwc");
        assert_eq!(settings.authorization.default_role, None);
        assert!(settings.models.is_empty());
        let mapping = settings.mapping();
        assert_eq!(
            mapping.mapper_defaults("table").and_then(|m| m.get("order")),
            Some(&json!("id"))
        );
    }

    #[test]
    fn test_settings_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let config_content = r#"
[database]
url = "sqlite://test.db"

[authorization]
default_role = "Guest"

[mappers.composite_table]
order = "name"

[models.Rule]
mapper = "composite_table"

[models.BlogArticle]
mapper = "resource_table"

[models.BlogArticle.config]
table = "articles"
"#;
        fs::write(&config_path, config_content).expect("Failed to write config");

        let settings = Settings::load(config_path.to_str().unwrap())
            .expect("Failed to load settings");

        assert_eq!(settings.database.url, "sqlite://test.db");
        assert_eq!(settings.authorization.default_role.as_deref(), Some("Guest"));

        let mapping = settings.mapping();
        let article = mapping.model("BlogArticle").expect("BlogArticle model");
        assert_eq!(article.mapper, "resource_table");
        assert_eq!(article.config.get("table"), Some(&json!("articles")));
        assert_eq!(mapping.model("rule").map(|m| m.mapper.as_str()), Some("composite_table"));
        assert_eq!(
            mapping
                .mapper_defaults("composite_table")
                .and_then(|m| m.get("order")),
            Some(&json!("name"))
        );
    }

    #[test]
    fn test_settings_env_override() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");
        fs::write(&config_path, "[mappers.resource_table]\ntable = \"from_file\"\n")
            .expect("Failed to write config");

        env::set_var("PARIAH__MAPPERS__RESOURCE_TABLE__TABLE", "from_env");
        let settings = Settings::load(config_path.to_str().unwrap())
            .expect("Failed to load settings");
        env::remove_var("PARIAH__MAPPERS__RESOURCE_TABLE__TABLE");

        let mapping = settings.mapping();
        let defaults = mapping
            .mapper_defaults("resource_table")
            .expect("resource_table defaults");
        assert_eq!(defaults.get("table"), Some(&json!("from_env")));
        // file and built-in defaults still merge underneath
        assert_eq!(defaults.get("order"), Some(&json!("id")));
    }

    #[test]
    fn test_mapping_builders() {
        let mapping = Mapping::default()
            .with_mapper_defaults("table", ConfigMap::from([("order".into(), json!("id"))]))
            .with_model("Role", "table", ConfigMap::new());
        assert_eq!(mapping.model("ROLE").map(|m| m.mapper.as_str()), Some("table"));
        assert!(mapping.model("Action").is_none());
    }
}
