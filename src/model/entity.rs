use crate::errors::PariahError;
use crate::model::{Data, EntityKind, Key, Schema, Value};

static NULL: Value = Value::Null;

/// A domain object with a declared field whitelist, identity and dirty state.
///
/// Fields come from the static schema of the entity's [`EntityKind`]. An
/// entity is *concrete* once it has an id, which happens when a mapper
/// loads or saves it. Components of composite kinds live alongside the
/// fields, see the methods in [`crate::model::composite`].
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    kind: EntityKind,
    data: Data,
    id: Option<Key>,
    dirty: bool,
    pub(crate) components: Vec<Entity>,
}

impl Entity {
    /// An empty, clean, non-concrete entity.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            data: Data::new(),
            id: None,
            dirty: false,
            components: Vec::new(),
        }
    }

    /// Build a dirty, non-concrete entity from raw field data.
    pub fn from_data(kind: EntityKind, data: Data) -> Result<Self, PariahError> {
        let schema = kind.schema();
        if let Some(field) = data.keys().find(|f| !schema.has_field(f)) {
            return Err(PariahError::field(kind, field));
        }
        Ok(Self {
            kind,
            data,
            id: None,
            dirty: true,
            components: Vec::new(),
        })
    }

    /// Dirty, non-concrete entity from fields known to be declared.
    /// Undeclared fields are dropped.
    pub(crate) fn prefilled<I>(kind: EntityKind, fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Value)>,
    {
        let schema = kind.schema();
        let data = fields
            .into_iter()
            .filter(|(field, _)| {
                debug_assert!(schema.has_field(field), "{kind} has no field {field}");
                schema.has_field(field)
            })
            .map(|(field, value)| (field.to_string(), value))
            .collect();
        Self {
            kind,
            data,
            id: None,
            dirty: true,
            components: Vec::new(),
        }
    }

    /// Build a clean, concrete entity from data read out of storage.
    /// Keys outside the schema are dropped.
    pub(crate) fn from_row(kind: EntityKind, id: Key, mut data: Data) -> Self {
        let schema = kind.schema();
        data.retain(|field, _| schema.has_field(field));
        Self {
            kind,
            data,
            id: Some(id),
            dirty: false,
            components: Vec::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn schema(&self) -> &'static Schema {
        self.kind.schema()
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.schema().fields
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.schema().has_field(field)
    }

    /// Read a field. Declared fields that were never set read as `null`.
    pub fn get(&self, field: &str) -> Result<&Value, PariahError> {
        if !self.has_field(field) {
            return Err(PariahError::field(self.kind, field));
        }
        Ok(self.data.get(field).unwrap_or(&NULL))
    }

    /// Read a field as a string; `None` when unset, null or not a string.
    pub fn get_str(&self, field: &str) -> Result<Option<&str>, PariahError> {
        Ok(self.get(field)?.as_str())
    }

    /// Write a field and mark the entity dirty.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), PariahError> {
        if !self.has_field(field) {
            return Err(PariahError::field(self.kind, field));
        }
        self.data.insert(field.to_string(), value.into());
        self.dirty = true;
        Ok(())
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// True once the entity is backed by a stored row.
    pub fn concrete(&self) -> bool {
        self.id.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Shallow copy of the field data; the id is not included.
    pub fn to_raw_data(&self) -> Data {
        self.data.clone()
    }

    pub(crate) fn data(&self) -> &Data {
        &self.data
    }

    pub(crate) fn mark_saved(&mut self, id: Key) {
        self.id = Some(id);
        self.dirty = false;
    }

    pub(crate) fn clear_id(&mut self) {
        self.id = None;
        self.dirty = true;
    }
}
