//! Mapping between entities and row-store rows.
//!
//! A [`MapperRegistry`] resolves an entity kind to a shared [`Mapper`].
//! The only mapper implementation is [`TableMapper`], whose behaviour is
//! selected by a [`MapperClass`] tag.

pub mod registry;
pub mod table;

use std::fmt;
use std::str::FromStr;

use crate::errors::PariahError;
use crate::inflector;
use crate::model::{Data, Entity, EntityKind, Key, Value};
use crate::settings::ConfigMap;
use crate::storage::{loosely_equal, Direction, RowQuery, PRIMARY_KEY};

pub use registry::MapperRegistry;
pub use table::TableMapper;

pub const ORDER_KEY: &str = "_order";
pub const COUNT_KEY: &str = "_count";
pub const OFFSET_KEY: &str = "_offset";

/// Selection criteria: field predicates plus ordering and pagination.
///
/// Predicates are keyed by entity field name (or `id`) and are translated
/// to column names by the mapper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    predicates: Data,
    order: Option<String>,
    count: Option<u64>,
    offset: Option<u64>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<Key>) -> Self {
        Self::new().with(PRIMARY_KEY, key_value(&id.into()))
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.predicates.insert(field.to_string(), value.into());
        self
    }

    /// `field`, `field asc`, `field desc` or `-field`.
    pub fn order_by(mut self, spec: &str) -> Self {
        self.order = Some(spec.to_string());
        self
    }

    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Build criteria from a raw map, lifting the reserved `_order`,
    /// `_count` and `_offset` keys out of the predicates.
    pub fn from_data(mut data: Data) -> Result<Self, PariahError> {
        let order = match data.remove(ORDER_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => return Err(PariahError::invalid_value(ORDER_KEY, &other)),
        };
        let count = reserved_number(&mut data, COUNT_KEY)?;
        let offset = reserved_number(&mut data, OFFSET_KEY)?;
        Ok(Self {
            predicates: data,
            order,
            count,
            offset,
        })
    }

    pub fn predicates(&self) -> &Data {
        &self.predicates
    }

    /// The id when the criteria select exactly one row by primary key.
    pub(crate) fn id_only(&self) -> Option<Key> {
        if self.predicates.len() != 1 || self.count.is_some() || self.offset.is_some() {
            return None;
        }
        self.predicates
            .get(PRIMARY_KEY)
            .and_then(crate::model::value_to_key)
    }

    /// Whether a loaded entity satisfies every predicate. Ordering and
    /// pagination play no part.
    pub fn matches(&self, entity: &Entity) -> Result<bool, PariahError> {
        for (field, expected) in &self.predicates {
            let matched = if field == PRIMARY_KEY {
                entity
                    .id()
                    .is_some_and(|id| loosely_equal(&Value::String(id.to_string()), expected))
            } else {
                loosely_equal(entity.get(field)?, expected)
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub(crate) fn row_query(&self, default_order: &str) -> Result<RowQuery, PariahError> {
        let spec = self.order.as_deref().unwrap_or(default_order);
        Ok(RowQuery {
            order: Some(parse_order(spec)?),
            limit: self.count,
            offset: self.offset,
        })
    }
}

fn reserved_number(data: &mut Data, key: &str) -> Result<Option<u64>, PariahError> {
    match data.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) if n.as_u64().is_some() => Ok(n.as_u64()),
        Some(Value::String(s)) if s.trim().parse::<u64>().is_ok() => Ok(s.trim().parse().ok()),
        Some(other) => Err(PariahError::invalid_value(key, &other)),
    }
}

/// Parse an ordering spec into a column and direction.
fn parse_order(spec: &str) -> Result<(String, Direction), PariahError> {
    let invalid = || PariahError::invalid_value(ORDER_KEY, &Value::String(spec.to_string()));
    let spec = spec.trim();

    if let Some(field) = spec.strip_prefix('-') {
        if field.is_empty() {
            return Err(invalid());
        }
        return Ok((inflector::field_to_column(field), Direction::Desc));
    }

    let mut words = spec.split_whitespace();
    let field = words.next().ok_or_else(invalid)?;
    let direction = match words.next().map(str::to_ascii_lowercase).as_deref() {
        None | Some("asc") => Direction::Asc,
        Some("desc") => Direction::Desc,
        Some(_) => return Err(invalid()),
    };
    if words.next().is_some() {
        return Err(invalid());
    }
    Ok((inflector::field_to_column(field), direction))
}

/// Numeric keys become JSON numbers so they compare equal to integer
/// columns; anything else stays a string.
pub(crate) fn key_value(key: &str) -> Value {
    match key.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(key.to_string()),
    }
}

/// Mapper class tags. Configuration names a class by its snake_case tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapperClass {
    /// CRUD only.
    Table,
    /// CRUD plus component loading.
    CompositeTable,
    /// Composite loading for resource kinds only.
    ResourceTable,
}

impl MapperClass {
    pub const ALL: [MapperClass; 3] = [
        MapperClass::Table,
        MapperClass::CompositeTable,
        MapperClass::ResourceTable,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MapperClass::Table => "table",
            MapperClass::CompositeTable => "composite_table",
            MapperClass::ResourceTable => "resource_table",
        }
    }

    pub fn loads_components(self) -> bool {
        !matches!(self, MapperClass::Table)
    }

    /// The class conventionally named after the kind (`<Type>Table`), if any.
    pub fn conventional_for(kind: EntityKind) -> Option<MapperClass> {
        let conventional = inflector::to_snake_case(&format!("{}Table", kind.name()));
        MapperClass::ALL.into_iter().find(|c| c.name() == conventional)
    }

    /// Fallback for unconfigured kinds: the conventional class, then a
    /// composite table for composite kinds, then a plain table.
    pub fn infer(kind: EntityKind) -> MapperClass {
        MapperClass::conventional_for(kind).unwrap_or(if kind.schema().is_composite() {
            MapperClass::CompositeTable
        } else {
            MapperClass::Table
        })
    }
}

impl fmt::Display for MapperClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MapperClass {
    type Err = PariahError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = inflector::to_snake_case(s);
        MapperClass::ALL
            .into_iter()
            .find(|c| c.name() == tag)
            .ok_or_else(|| PariahError::Configuration(format!("unknown mapper class `{s}`")))
    }
}

/// Options understood by table mappers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperOptions {
    pub table: String,
    /// Ordering spec applied when criteria carry no `_order`.
    pub order: String,
}

impl MapperOptions {
    pub fn from_config(kind: EntityKind, config: &ConfigMap) -> Result<Self, PariahError> {
        let mut options = Self {
            table: inflector::table_name(kind.name()),
            order: PRIMARY_KEY.to_string(),
        };
        for (key, value) in config {
            match key.as_str() {
                "table" => options.table = option_string(key, value)?,
                "order" => {
                    let order = option_string(key, value)?;
                    parse_order(&order)?;
                    options.order = order;
                }
                other => tracing::warn!(%kind, option = other, "Ignoring unknown mapper option"),
            }
        }
        Ok(options)
    }
}

fn option_string(key: &str, value: &Value) -> Result<String, PariahError> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(PariahError::invalid_value(key, value)),
    }
}

/// Loads and stores one entity kind.
///
/// Mappers are shared across threads once published by the registry, so
/// implementations keep no per-call state.
pub trait Mapper: Send + Sync + fmt::Debug {
    fn kind(&self) -> EntityKind;

    fn class(&self) -> MapperClass;

    fn table(&self) -> &str;

    /// Load the single entity matching `criteria`.
    ///
    /// Zero matches fail with `NotFound`, several with `Ambiguous`. To take
    /// the first of several matches, set a count of 1.
    fn load_model(&self, criteria: &Criteria) -> Result<Entity, PariahError>;

    fn load_models(&self, criteria: &Criteria) -> Result<Vec<Entity>, PariahError>;

    /// Update if concrete, insert otherwise; clean entities are left alone.
    fn save_model(&self, entity: &mut Entity) -> Result<(), PariahError>;

    /// Delete the entity's row; the entity stops being concrete.
    fn delete_model(&self, entity: &mut Entity) -> Result<(), PariahError>;

    /// Delete every row matching `criteria` and return how many went.
    fn delete_where(&self, criteria: &Criteria) -> Result<usize, PariahError>;

    /// Build an entity from raw data and insert it.
    fn create_model(&self, data: Data) -> Result<Entity, PariahError>;

    /// Load the components of one type without attaching them.
    fn fetch_components(
        &self,
        registry: &MapperRegistry,
        composite: &Entity,
        kind: EntityKind,
    ) -> Result<Vec<Entity>, PariahError>;

    /// Load and attach components of one type, or of every declared type
    /// when `kind` is `None`. Nothing is attached unless every requested
    /// type loads. Returns the number of components attached.
    fn load_components(
        &self,
        registry: &MapperRegistry,
        composite: &mut Entity,
        kind: Option<EntityKind>,
    ) -> Result<usize, PariahError> {
        self.load_components_matching(registry, composite, kind, &Criteria::new())
    }

    /// Like `load_components`, attaching only components that match
    /// `filter`. A predicate on a field the component lacks is a
    /// `FieldError`.
    fn load_components_matching(
        &self,
        registry: &MapperRegistry,
        composite: &mut Entity,
        kind: Option<EntityKind>,
        filter: &Criteria,
    ) -> Result<usize, PariahError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_data_strips_reserved_keys() {
        let mut data = Data::new();
        data.insert("name".into(), json!("Guest"));
        data.insert("_order".into(), json!("name desc"));
        data.insert("_count".into(), json!(10));
        data.insert("_offset".into(), json!("5"));

        let criteria = Criteria::from_data(data).unwrap();
        assert_eq!(criteria.predicates().len(), 1);
        assert!(criteria.predicates().contains_key("name"));

        let query = criteria.row_query("id").unwrap();
        assert_eq!(query.order, Some(("name".into(), Direction::Desc)));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
    }

    #[test]
    fn test_matches_loaded_entities() {
        let mut guest = Entity::new(EntityKind::Role);
        guest.set("name", "Guest").unwrap();
        guest.mark_saved("3".to_string());

        assert!(Criteria::new().matches(&guest).unwrap());
        assert!(Criteria::new().with("name", "Guest").count(1).matches(&guest).unwrap());
        assert!(Criteria::by_id("3").matches(&guest).unwrap());
        assert!(!Criteria::new().with("name", "Admin").matches(&guest).unwrap());
        assert!(!Criteria::by_id("4").matches(&guest).unwrap());
        assert!(matches!(
            Criteria::new().with("title", "x").matches(&guest),
            Err(PariahError::Field { .. })
        ));
    }

    #[test]
    fn test_from_data_rejects_bad_paging() {
        let mut data = Data::new();
        data.insert("_count".into(), json!(-1));
        assert!(matches!(
            Criteria::from_data(data),
            Err(PariahError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_parse_order() {
        assert_eq!(parse_order("title").unwrap(), ("title".into(), Direction::Asc));
        assert_eq!(
            parse_order("-passwordHash").unwrap(),
            ("password_hash".into(), Direction::Desc)
        );
        assert_eq!(parse_order("date DESC").unwrap(), ("date".into(), Direction::Desc));
        assert!(parse_order("date sideways").is_err());
        assert!(parse_order("").is_err());
        assert!(parse_order("-").is_err());
    }

    #[test]
    fn test_id_only() {
        assert_eq!(Criteria::by_id("3").id_only().as_deref(), Some("3"));
        assert_eq!(Criteria::by_id("3").count(1).id_only(), None);
        assert_eq!(Criteria::by_id("3").with("name", "x").id_only(), None);
        assert_eq!(Criteria::by_id("3").predicates()["id"], json!(3));
        assert_eq!(Criteria::by_id("abc").predicates()["id"], json!("abc"));
    }

    #[test]
    fn test_mapper_class_inference() {
        assert_eq!(
            MapperClass::conventional_for(EntityKind::Resource),
            Some(MapperClass::ResourceTable)
        );
        assert_eq!(MapperClass::conventional_for(EntityKind::Blog), None);
        assert_eq!(MapperClass::infer(EntityKind::Blog), MapperClass::CompositeTable);
        assert_eq!(MapperClass::infer(EntityKind::Rule), MapperClass::CompositeTable);
        assert_eq!(MapperClass::infer(EntityKind::Action), MapperClass::Table);
        assert_eq!(
            "CompositeTable".parse::<MapperClass>().unwrap(),
            MapperClass::CompositeTable
        );
        assert!("view".parse::<MapperClass>().is_err());
    }

    #[test]
    fn test_mapper_options() {
        let defaults = MapperOptions::from_config(EntityKind::BlogArticle, &ConfigMap::new()).unwrap();
        assert_eq!(defaults.table, "blog_articles");
        assert_eq!(defaults.order, "id");

        let mut config = ConfigMap::new();
        config.insert("table".into(), json!("articles"));
        config.insert("order".into(), json!("-date"));
        config.insert("colour".into(), json!("blue"));
        let options = MapperOptions::from_config(EntityKind::BlogArticle, &config).unwrap();
        assert_eq!(options.table, "articles");
        assert_eq!(options.order, "-date");

        config.insert("table".into(), json!(5));
        assert!(MapperOptions::from_config(EntityKind::BlogArticle, &config).is_err());
    }
}
