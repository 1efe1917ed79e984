use std::fmt;
use std::str::FromStr;

use crate::errors::PariahError;
use crate::model::{Entity, EntityKind, Key};

/// Reference to a stored entity by type and primary key.
///
/// Written as `Type:key`. A `ResourceId` never loads anything itself;
/// resolve it through a mapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    type_name: String,
    key: Key,
}

impl ResourceId {
    pub fn new(type_name: impl Into<String>, key: impl Into<Key>) -> Result<Self, PariahError> {
        let type_name = type_name.into();
        let key = key.into();
        if type_name.is_empty() || key.is_empty() {
            return Err(PariahError::Identity(format!(
                "`{type_name}:{key}` needs a non-empty type and key"
            )));
        }
        Ok(Self { type_name, key })
    }

    /// Id of a concrete entity.
    pub fn of(entity: &Entity) -> Result<Self, PariahError> {
        let key = entity.id().ok_or_else(|| {
            PariahError::Resource(format!("{} has no id until it is saved", entity.kind()))
        })?;
        Self::new(entity.kind().name(), key)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The entity kind named by this id.
    pub fn kind(&self) -> Result<EntityKind, PariahError> {
        self.type_name
            .parse()
            .map_err(|_| PariahError::Identity(format!("unknown entity type in `{self}`")))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.key)
    }
}

impl FromStr for ResourceId {
    type Err = PariahError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (type_name, key) = s.split_once(':').ok_or_else(|| {
            PariahError::Identity(format!("`{s}` is not of the form \"Type:key\""))
        })?;
        Self::new(type_name, key)
    }
}
