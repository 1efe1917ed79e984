use std::fmt;
use std::sync::Arc;

use crate::errors::PariahError;
use crate::inflector;
use crate::mapper::{Criteria, Mapper, MapperClass, MapperOptions, MapperRegistry};
use crate::model::{value_to_key, Cardinality, Data, Entity, EntityKind, Value};
use crate::storage::{Row, RowQuery, RowStore, PRIMARY_KEY};

/// Mapper for entities stored one row per entity in a single table.
///
/// Fields map to snake_case columns. Foreign keys used by component
/// loading are plain columns and are never part of an entity's fields.
pub struct TableMapper {
    kind: EntityKind,
    class: MapperClass,
    options: MapperOptions,
    store: Arc<dyn RowStore>,
}

impl fmt::Debug for TableMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableMapper")
            .field("kind", &self.kind)
            .field("class", &self.class)
            .field("options", &self.options)
            .finish()
    }
}

impl TableMapper {
    pub fn new(
        kind: EntityKind,
        class: MapperClass,
        options: MapperOptions,
        store: Arc<dyn RowStore>,
    ) -> Result<Self, PariahError> {
        if class == MapperClass::ResourceTable && !kind.is_resource() {
            return Err(PariahError::Configuration(format!(
                "`{}` mapper cannot map {kind}, which is not a resource type",
                class
            )));
        }
        Ok(Self {
            kind,
            class,
            options,
            store,
        })
    }

    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    fn check_kind(&self, entity: &Entity) -> Result<(), PariahError> {
        if entity.kind() != self.kind {
            return Err(PariahError::Structure(format!(
                "{} mapper cannot handle a {}",
                self.kind,
                entity.kind()
            )));
        }
        Ok(())
    }

    fn to_row(&self, entity: &Entity) -> Row {
        entity
            .data()
            .iter()
            .map(|(field, value)| (inflector::field_to_column(field), value.clone()))
            .collect()
    }

    fn build(&self, mut row: Row) -> Result<Entity, PariahError> {
        let id = row
            .remove(PRIMARY_KEY)
            .as_ref()
            .and_then(value_to_key)
            .ok_or_else(|| {
                PariahError::Schema(format!(
                    "row in `{}` has no `{PRIMARY_KEY}` column",
                    self.options.table
                ))
            })?;
        let data: Data = row
            .into_iter()
            .map(|(column, value)| (inflector::column_to_field(&column), value))
            .collect();
        Ok(Entity::from_row(self.kind, id, data))
    }

    fn find(&self, criteria: &Criteria) -> Result<Vec<Row>, PariahError> {
        let table = &self.options.table;
        if let Some(id) = criteria.id_only() {
            return Ok(self.store.find_by_id(table, &id)?.into_iter().collect());
        }

        let predicates: Row = criteria
            .predicates()
            .iter()
            .map(|(field, value)| (inflector::field_to_column(field), value.clone()))
            .collect();
        let query = criteria.row_query(&self.options.order)?;
        let rows = self.store.find_where(table, &predicates, &query)?;
        tracing::debug!(table = %table, rows = rows.len(), "Queried rows");
        Ok(rows)
    }

    /// Re-read the composite's own row to get at its foreign key columns.
    fn composite_row(&self, id: &str) -> Result<Row, PariahError> {
        self.store
            .find_by_id(&self.options.table, id)?
            .ok_or_else(|| PariahError::NotFound(format!("{} {id}", self.kind)))
    }

    fn foreign_key<'r>(&self, row: &'r Row, column: &str) -> Result<&'r Value, PariahError> {
        row.get(column).ok_or_else(|| {
            PariahError::Schema(format!(
                "`{}` has no column `{column}`",
                self.options.table
            ))
        })
    }

    /// Fail unless rows of `table` carry `column`. An empty table passes.
    fn require_column(&self, table: &str, column: &str) -> Result<(), PariahError> {
        let sample = RowQuery {
            limit: Some(1),
            ..RowQuery::default()
        };
        match self.store.find_where(table, &Row::new(), &sample)?.first() {
            Some(row) if !row.contains_key(column) => Err(PariahError::Schema(format!(
                "`{table}` has no column `{column}`"
            ))),
            _ => Ok(()),
        }
    }
}

/// Ids listed in a many-to-many column. Null or blank means none.
fn id_list(column: &str, value: &Value) -> Result<Vec<String>, PariahError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(list) => Ok(list
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()),
        Value::Number(n) => Ok(vec![n.to_string()]),
        Value::Array(items) => items
            .iter()
            .map(|item| value_to_key(item).ok_or_else(|| PariahError::invalid_value(column, value)))
            .collect(),
        other => Err(PariahError::invalid_value(column, other)),
    }
}

impl Mapper for TableMapper {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn class(&self) -> MapperClass {
        self.class
    }

    fn table(&self) -> &str {
        &self.options.table
    }

    fn load_model(&self, criteria: &Criteria) -> Result<Entity, PariahError> {
        let mut rows = self.find(criteria)?;
        match rows.len() {
            0 => Err(PariahError::NotFound(format!(
                "no {} matches {:?}",
                self.kind,
                criteria.predicates()
            ))),
            1 => self.build(rows.remove(0)),
            count => Err(PariahError::Ambiguous {
                table: self.options.table.clone(),
                count,
            }),
        }
    }

    fn load_models(&self, criteria: &Criteria) -> Result<Vec<Entity>, PariahError> {
        self.find(criteria)?
            .into_iter()
            .map(|row| self.build(row))
            .collect()
    }

    fn save_model(&self, entity: &mut Entity) -> Result<(), PariahError> {
        self.check_kind(entity)?;
        if !entity.is_dirty() {
            return Ok(());
        }

        let row = self.to_row(entity);
        let id = match entity.id() {
            Some(id) => {
                self.store.update(&self.options.table, &row, id)?;
                id.to_string()
            }
            None => self.store.insert(&self.options.table, &row)?,
        };
        tracing::debug!(kind = %self.kind, %id, "Saved entity");
        entity.mark_saved(id);
        Ok(())
    }

    fn delete_model(&self, entity: &mut Entity) -> Result<(), PariahError> {
        self.check_kind(entity)?;
        let id = entity.id().ok_or_else(|| {
            PariahError::Resource(format!("cannot delete a {} that was never saved", self.kind))
        })?;
        self.store.delete(&self.options.table, id)?;
        tracing::debug!(kind = %self.kind, %id, "Deleted entity");
        entity.clear_id();
        Ok(())
    }

    fn delete_where(&self, criteria: &Criteria) -> Result<usize, PariahError> {
        let ids: Vec<String> = self
            .find(criteria)?
            .iter()
            .filter_map(|row| row.get(PRIMARY_KEY).and_then(value_to_key))
            .collect();
        for id in &ids {
            self.store.delete(&self.options.table, id)?;
        }
        Ok(ids.len())
    }

    fn create_model(&self, data: Data) -> Result<Entity, PariahError> {
        let mut entity = Entity::from_data(self.kind, data)?;
        self.save_model(&mut entity)?;
        Ok(entity)
    }

    fn fetch_components(
        &self,
        registry: &MapperRegistry,
        composite: &Entity,
        kind: EntityKind,
    ) -> Result<Vec<Entity>, PariahError> {
        if !self.class.loads_components() {
            return Err(PariahError::Structure(format!(
                "`{}` mapper for {} does not load components",
                self.class, self.kind
            )));
        }
        self.check_kind(composite)?;
        let cardinality = composite.cardinality_of(kind).ok_or_else(|| {
            PariahError::Structure(format!("{} does not hold {kind} components", self.kind))
        })?;
        let id = composite.id().ok_or_else(|| {
            PariahError::Resource(format!(
                "cannot load components of a {} that was never saved",
                self.kind
            ))
        })?;

        let mapper = registry.component_mapper(kind)?;
        let component = inflector::to_snake_case(kind.name());

        let components = match cardinality {
            Cardinality::OneToOne | Cardinality::ManyToOne => {
                let row = self.composite_row(id)?;
                let column = format!("{component}_id");
                match value_to_key(self.foreign_key(&row, &column)?) {
                    Some(key) => vec![mapper.load_model(&Criteria::by_id(key))?],
                    None => Vec::new(),
                }
            }
            Cardinality::OneToMany => {
                let column = format!("{}_id", inflector::to_snake_case(self.kind.name()));
                self.require_column(mapper.table(), &column)?;
                mapper.load_models(&Criteria::new().with(&column, super::key_value(id)))?
            }
            Cardinality::ManyToMany => {
                let row = self.composite_row(id)?;
                let column = format!("{component}_ids");
                id_list(&column, self.foreign_key(&row, &column)?)?
                    .into_iter()
                    .map(|key| mapper.load_model(&Criteria::by_id(key)))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        tracing::debug!(
            composite = %self.kind,
            %id,
            component = %kind,
            cardinality = cardinality.mnemonic(),
            count = components.len(),
            "Loaded components"
        );
        Ok(components)
    }

    fn load_components_matching(
        &self,
        registry: &MapperRegistry,
        composite: &mut Entity,
        kind: Option<EntityKind>,
        filter: &Criteria,
    ) -> Result<usize, PariahError> {
        let kinds: Vec<EntityKind> = match kind {
            Some(kind) => vec![kind],
            None => composite.structure().iter().map(|(k, _)| *k).collect(),
        };

        let mut loaded = Vec::new();
        for kind in kinds {
            for component in self.fetch_components(registry, composite, kind)? {
                if filter.matches(&component)? {
                    loaded.push(component);
                }
            }
        }

        let count = loaded.len();
        composite.add_components(loaded)?;
        Ok(count)
    }
}
