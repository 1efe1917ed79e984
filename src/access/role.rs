use std::ops::{Deref, DerefMut};

use crate::access::expect_kind;
use crate::errors::PariahError;
use crate::model::{Entity, EntityKind, Value};

/// Outcome a rule applies to its role/action pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Permit,
    Forbid,
}

impl Verdict {
    /// Accepts a bool, `1`/`0`, or `true`/`false`/`permit`/`forbid` in any case.
    pub fn from_value(value: &Value) -> Result<Self, PariahError> {
        let permit = match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "permit" | "1" => Some(true),
                "false" | "forbid" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        match permit {
            Some(true) => Ok(Verdict::Permit),
            Some(false) => Ok(Verdict::Forbid),
            None => Err(PariahError::invalid_value("permit", value)),
        }
    }

    pub fn to_value(self) -> Value {
        Value::Bool(self == Verdict::Permit)
    }
}

/// A named role. Roles form a tree through their `parent` field, which
/// holds the parent role's name.
#[derive(Debug, Clone, PartialEq)]
pub struct Role(Entity);

impl Role {
    pub fn new(name: &str) -> Self {
        Self(Entity::prefilled(EntityKind::Role, [("name", Value::from(name))]))
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get_str("name").ok().flatten()
    }

    /// Roles are keyed by name.
    pub fn role_key(&self) -> Option<&str> {
        self.name()
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.0
            .get_str("parent")
            .ok()
            .flatten()
            .filter(|p| !p.is_empty())
    }

    /// Link to a parent role by name.
    ///
    /// Only a self-link is rejected here. Longer cycles run through stored
    /// roles and fail with `Cycle` when a `ResourceAcl` registers the chain.
    pub fn set_parent(&mut self, parent: &Role) -> Result<(), PariahError> {
        let parent_name = parent.name().ok_or_else(|| {
            PariahError::invalid_value("parent", &Value::Null)
        })?;
        if Some(parent_name) == self.name() {
            return Err(PariahError::Cycle(format!("role {parent_name} cannot be its own parent")));
        }
        let parent_name = parent_name.to_string();
        self.0.set("parent", parent_name)
    }

    pub fn into_entity(self) -> Entity {
        self.0
    }
}

impl TryFrom<Entity> for Role {
    type Error = PariahError;

    fn try_from(entity: Entity) -> Result<Self, Self::Error> {
        expect_kind(entity, EntityKind::Role).map(Self)
    }
}

/// A verb a rule grants or denies.
#[derive(Debug, Clone, PartialEq)]
pub struct Action(Entity);

impl Action {
    pub fn new(name: &str) -> Self {
        Self(Entity::prefilled(EntityKind::Action, [("name", Value::from(name))]))
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get_str("name").ok().flatten()
    }

    pub fn into_entity(self) -> Entity {
        self.0
    }
}

impl TryFrom<Entity> for Action {
    type Error = PariahError;

    fn try_from(entity: Entity) -> Result<Self, Self::Error> {
        expect_kind(entity, EntityKind::Action).map(Self)
    }
}

/// Applies a verdict to every (role, action) pair it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule(Entity);

impl Rule {
    pub fn new(name: &str, verdict: Verdict) -> Self {
        Self(Entity::prefilled(
            EntityKind::Rule,
            [("name", Value::from(name)), ("permit", verdict.to_value())],
        ))
    }

    pub fn verdict(&self) -> Result<Verdict, PariahError> {
        Verdict::from_value(self.0.get("permit")?)
    }

    pub fn roles(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.0.components_of(EntityKind::Role)
    }

    pub fn actions(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.0.components_of(EntityKind::Action)
    }

    pub fn add_role(&mut self, role: Role) -> Result<usize, PariahError> {
        self.0.add_component(role.into_entity())
    }

    pub fn add_action(&mut self, action: Action) -> Result<usize, PariahError> {
        self.0.add_component(action.into_entity())
    }

    pub fn into_entity(self) -> Entity {
        self.0
    }
}

impl TryFrom<Entity> for Rule {
    type Error = PariahError;

    fn try_from(entity: Entity) -> Result<Self, Self::Error> {
        expect_kind(entity, EntityKind::Rule).map(Self)
    }
}

macro_rules! deref_entity {
    ($($ty:ty),*) => {$(
        impl Deref for $ty {
            type Target = Entity;

            fn deref(&self) -> &Entity {
                &self.0
            }
        }

        impl DerefMut for $ty {
            fn deref_mut(&mut self) -> &mut Entity {
                &mut self.0
            }
        }
    )*};
}

deref_entity!(Role, Action, Rule);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verdict_parsing() {
        assert_eq!(Verdict::from_value(&json!(true)).unwrap(), Verdict::Permit);
        assert_eq!(Verdict::from_value(&json!(0)).unwrap(), Verdict::Forbid);
        assert_eq!(Verdict::from_value(&json!("Forbid")).unwrap(), Verdict::Forbid);
        assert_eq!(Verdict::from_value(&json!("PERMIT")).unwrap(), Verdict::Permit);
        assert_eq!(Verdict::from_value(&json!("false")).unwrap(), Verdict::Forbid);
        assert!(matches!(
            Verdict::from_value(&json!("maybe")),
            Err(PariahError::InvalidValue { .. })
        ));
        assert!(Verdict::from_value(&json!(2)).is_err());
        assert!(Verdict::from_value(&Value::Null).is_err());
    }

    #[test]
    fn test_role_parent() {
        let guest = Role::new("Guest");
        let mut editor = Role::new("Editor");
        assert_eq!(editor.parent_name(), None);

        editor.set_parent(&guest).unwrap();
        assert_eq!(editor.parent_name(), Some("Guest"));
        assert_eq!(editor.role_key(), Some("Editor"));

        let mut self_parent = Role::new("Guest");
        assert!(matches!(
            self_parent.set_parent(&guest),
            Err(PariahError::Cycle(_))
        ));
    }

    #[test]
    fn test_rule_components() {
        let mut rule = Rule::new("no-delete", Verdict::Forbid);
        rule.add_role(Role::new("Guest")).unwrap();
        rule.add_action(Action::new("delete")).unwrap();

        assert_eq!(rule.verdict().unwrap(), Verdict::Forbid);
        assert_eq!(rule.roles().count(), 1);
        assert_eq!(rule.actions().count(), 1);
        assert!(rule.is_dirty());
    }

    #[test]
    fn test_try_from_checks_kind() {
        assert!(Role::try_from(Entity::new(EntityKind::Role)).is_ok());
        assert!(matches!(
            Action::try_from(Entity::new(EntityKind::Role)),
            Err(PariahError::Structure(_))
        ));
    }
}
