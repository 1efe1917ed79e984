pub mod composite;
pub mod entity;
pub mod kind;

use std::collections::BTreeMap;

pub use composite::ComponentMatch;
pub use entity::Entity;
pub use kind::{Cardinality, EntityKind, Schema};

/// Field values are stored as JSON values.
pub type Value = serde_json::Value;

/// Primary keys travel as strings; stores convert to their native key type.
pub type Key = String;

/// Field name -> value map.
pub type Data = BTreeMap<String, Value>;

/// Render a scalar value as a key. Returns `None` for null, arrays and objects.
pub fn value_to_key(value: &Value) -> Option<Key> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
