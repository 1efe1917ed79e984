use std::ops::{Deref, DerefMut};

use crate::access::ResourceId;
use crate::errors::PariahError;
use crate::model::{Entity, EntityKind, Value};

/// An entity of a resource kind: it may name a parent resource and carries
/// Rule components.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource(Entity);

impl Resource {
    pub fn new(kind: EntityKind) -> Result<Self, PariahError> {
        Self::try_from(Entity::new(kind))
    }

    /// The parent resource, if one is set.
    pub fn parent(&self) -> Result<Option<ResourceId>, PariahError> {
        match self.0.get("parent")? {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => s.parse().map(Some),
            other => Err(PariahError::invalid_value("parent", other)),
        }
    }

    /// Only a self-link is rejected here. Longer cycles fail with `Cycle`
    /// when `ResourceAcl::new` walks the stored parent chain.
    pub fn set_parent(&mut self, parent: &ResourceId) -> Result<(), PariahError> {
        if let Ok(own) = self.resource_id() {
            if own == *parent {
                return Err(PariahError::Cycle(format!("{own} cannot be its own parent")));
            }
        }
        self.0.set("parent", parent.to_string())
    }

    pub fn clear_parent(&mut self) -> Result<(), PariahError> {
        self.0.set("parent", Value::Null)
    }

    /// Fails unless the resource has been saved.
    pub fn resource_id(&self) -> Result<ResourceId, PariahError> {
        ResourceId::of(&self.0)
    }

    /// Rule components currently attached.
    pub fn rules(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.0.components_of(EntityKind::Rule)
    }

    pub fn into_entity(self) -> Entity {
        self.0
    }
}

impl TryFrom<Entity> for Resource {
    type Error = PariahError;

    fn try_from(entity: Entity) -> Result<Self, Self::Error> {
        if !entity.kind().is_resource() {
            return Err(PariahError::Structure(format!(
                "{} is not a resource type",
                entity.kind()
            )));
        }
        Ok(Self(entity))
    }
}

impl Deref for Resource {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &self.0
    }
}

impl DerefMut for Resource {
    fn deref_mut(&mut self) -> &mut Entity {
        &mut self.0
    }
}
