//! Component operations for composite entities.
//!
//! A composite is an entity whose schema declares a structure: the component
//! types it may hold and their cardinality. Components are kept in insertion
//! order. Adding the same component twice stores it twice; callers needing
//! set semantics check [`Entity::has_component`] first.

use crate::errors::PariahError;
use crate::model::{Cardinality, Data, Entity, EntityKind, Key};

/// Describes which components to select.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentMatch {
    /// Match on the component id.
    Id(Key),
    /// Every field/value pair must match.
    Fields(Data),
}

impl ComponentMatch {
    pub fn id(id: impl Into<Key>) -> Self {
        ComponentMatch::Id(id.into())
    }

    pub fn field(field: &str, value: impl Into<crate::model::Value>) -> Self {
        let mut data = Data::new();
        data.insert(field.to_string(), value.into());
        ComponentMatch::Fields(data)
    }

    fn matches(&self, component: &Entity) -> bool {
        match self {
            ComponentMatch::Id(id) => component.id() == Some(id.as_str()),
            ComponentMatch::Fields(expected) => expected
                .iter()
                .all(|(field, value)| component.get(field).map(|v| v == value).unwrap_or(false)),
        }
    }
}

impl Entity {
    pub fn structure(&self) -> &'static [(EntityKind, Cardinality)] {
        self.schema().structure
    }

    pub fn cardinality_of(&self, kind: EntityKind) -> Option<Cardinality> {
        self.schema().cardinality_of(kind)
    }

    /// True if components of `kind` may be added.
    pub fn holds(&self, kind: EntityKind) -> bool {
        self.cardinality_of(kind).is_some()
    }

    /// Append a component and return its index.
    pub fn add_component(&mut self, component: Entity) -> Result<usize, PariahError> {
        if !self.holds(component.kind()) {
            return Err(PariahError::Structure(format!(
                "{} cannot hold components of type {}",
                self.kind(),
                component.kind()
            )));
        }
        self.components.push(component);
        Ok(self.components.len() - 1)
    }

    /// Append several components; stops at the first rejected one.
    pub fn add_components<I>(&mut self, components: I) -> Result<(), PariahError>
    where
        I: IntoIterator<Item = Entity>,
    {
        for component in components {
            self.add_component(component)?;
        }
        Ok(())
    }

    /// All components, in insertion order.
    pub fn components(&self) -> &[Entity] {
        &self.components
    }

    /// Components filtered by type and/or a match description.
    /// With neither filter every component is returned.
    pub fn get_components(
        &self,
        kind: Option<EntityKind>,
        spec: Option<&ComponentMatch>,
    ) -> Vec<&Entity> {
        self.components
            .iter()
            .filter(|c| kind.map_or(true, |k| c.kind() == k))
            .filter(|c| spec.map_or(true, |s| s.matches(c)))
            .collect()
    }

    /// Components of one type.
    pub fn components_of(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> + '_ {
        self.components.iter().filter(move |c| c.kind() == kind)
    }

    /// First component matching the filters.
    pub fn get_component(
        &self,
        kind: Option<EntityKind>,
        spec: Option<&ComponentMatch>,
    ) -> Option<&Entity> {
        self.find_component(kind, spec).map(|i| &self.components[i])
    }

    pub fn has_component(&self, kind: Option<EntityKind>, spec: Option<&ComponentMatch>) -> bool {
        self.find_component(kind, spec).is_some()
    }

    /// Remove and return the first component matching the filters.
    pub fn remove_component(
        &mut self,
        kind: Option<EntityKind>,
        spec: Option<&ComponentMatch>,
    ) -> Option<Entity> {
        let index = self.find_component(kind, spec)?;
        Some(self.components.remove(index))
    }

    fn find_component(&self, kind: Option<EntityKind>, spec: Option<&ComponentMatch>) -> Option<usize> {
        self.components.iter().position(|c| {
            kind.map_or(true, |k| c.kind() == k) && spec.map_or(true, |s| s.matches(c))
        })
    }
}
