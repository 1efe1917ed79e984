use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PariahError {
    #[error("{kind} has no field `{field}`")]
    #[diagnostic(
        code(pariah::field),
        help("Only fields declared in the entity schema can be read or written")
    )]
    Field { kind: String, field: String },

    #[error("Invalid component: {0}")]
    #[diagnostic(
        code(pariah::structure),
        help("A composite only holds components whose type appears in its structure")
    )]
    Structure(String),

    #[error("Invalid resource id: {0}")]
    #[diagnostic(
        code(pariah::identity),
        help("Resource ids have the form \"Type:key\" with both parts non-empty")
    )]
    Identity(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(pariah::configuration),
        help("Declare the model under [models.<Type>] with a `mapper` class")
    )]
    Configuration(String),

    #[error("Not found: {0}")]
    #[diagnostic(code(pariah::not_found))]
    NotFound(String),

    #[error("Ambiguous criteria: {count} rows in `{table}` match where one was expected")]
    #[diagnostic(
        code(pariah::ambiguous),
        help("Narrow the criteria, or use load_models to fetch every match")
    )]
    Ambiguous { table: String, count: usize },

    #[error("Schema mismatch: {0}")]
    #[diagnostic(
        code(pariah::schema),
        help("Foreign keys live in `<type>_id` or `<type>_ids` columns named after the component type")
    )]
    Schema(String),

    #[error("Resource error: {0}")]
    #[diagnostic(
        code(pariah::resource),
        help("Save the entity first so it has an id")
    )]
    Resource(String),

    #[error("Cyclic parent link detected: {0}")]
    #[diagnostic(
        code(pariah::cycle),
        help("Check the `parent` fields of your roles and resources for circular references")
    )]
    Cycle(String),

    #[error("Invalid value for `{field}`: {value}")]
    #[diagnostic(code(pariah::invalid_value))]
    InvalidValue { field: String, value: String },

    #[error("Authentication failed: {0}")]
    #[diagnostic(code(pariah::authentication))]
    Authentication(String),

    #[error("Database error: {0}")]
    #[diagnostic(code(pariah::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("Config error: {0}")]
    #[diagnostic(code(pariah::config))]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    #[diagnostic(code(pariah::io))]
    Io(#[from] std::io::Error),
}

impl PariahError {
    pub(crate) fn field(kind: impl ToString, field: &str) -> Self {
        PariahError::Field {
            kind: kind.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid_value(field: &str, value: &serde_json::Value) -> Self {
        PariahError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PariahError::NotFound(_))
    }
}
