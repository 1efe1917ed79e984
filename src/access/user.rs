use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;
use subtle::ConstantTimeEq;

use crate::access::{expect_kind, Role};
use crate::errors::PariahError;
use crate::mapper::{Criteria, MapperRegistry};
use crate::model::{ComponentMatch, Entity, EntityKind, Value};
use crate::settings::Authorization;

/// Anything that holds roles.
pub trait Principal {
    fn role_names(&self) -> Vec<String>;

    /// Parent of a held role, when the principal knows it.
    fn parent_of(&self, _role: &str) -> Option<String> {
        None
    }
}

/// A user account. Users are resources and carry Role components.
#[derive(Debug, Clone, PartialEq)]
pub struct User(Entity);

impl User {
    pub fn new(username: &str) -> Self {
        Self(Entity::prefilled(
            EntityKind::User,
            [("username", Value::from(username))],
        ))
    }

    pub fn username(&self) -> Option<&str> {
        self.0.get_str("username").ok().flatten()
    }

    pub fn add_role(&mut self, role: Role) -> Result<usize, PariahError> {
        self.0.add_component(role.into_entity())
    }

    pub fn roles(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.0.components_of(EntityKind::Role)
    }

    pub fn into_entity(self) -> Entity {
        self.0
    }
}

impl Principal for User {
    fn role_names(&self) -> Vec<String> {
        self.roles()
            .filter_map(|role| role.get_str("name").ok().flatten())
            .map(str::to_string)
            .collect()
    }

    fn parent_of(&self, role: &str) -> Option<String> {
        self.0
            .get_component(Some(EntityKind::Role), Some(&ComponentMatch::field("name", role)))
            .and_then(|r| r.get_str("parent").ok().flatten())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }
}

impl TryFrom<Entity> for User {
    type Error = PariahError;

    fn try_from(entity: Entity) -> Result<Self, Self::Error> {
        expect_kind(entity, EntityKind::User).map(Self)
    }
}

impl Deref for User {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &self.0
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Entity {
        &mut self.0
    }
}

/// Session-level authentication consumed by callers of the ACL.
pub trait Authenticator {
    fn current_user(&self) -> Option<User>;

    /// Check credentials and start a session.
    fn login(&self, username: &str, credential_hash: &str) -> Result<User, PariahError>;

    fn logout(&self);
}

/// Authenticates against the `User` table, one session at a time.
#[derive(Debug)]
pub struct StoreAuthenticator {
    registry: Arc<MapperRegistry>,
    default_role: Option<String>,
    session: Mutex<Option<User>>,
}

impl StoreAuthenticator {
    pub fn new(registry: Arc<MapperRegistry>, settings: &Authorization) -> Self {
        Self {
            registry,
            default_role: settings.default_role.clone(),
            session: Mutex::new(None),
        }
    }

    fn rejected() -> PariahError {
        PariahError::Authentication("invalid username or password".to_string())
    }

    /// Load the user with its roles, plus the default role if configured.
    fn load_user(&self, username: &str, credential_hash: &str) -> Result<User, PariahError> {
        let users = self.registry.component_mapper(EntityKind::User)?;
        let mut entity = match users.load_model(&Criteria::new().with("username", username)) {
            Ok(entity) => entity,
            Err(e) if e.is_not_found() => return Err(Self::rejected()),
            Err(e) => return Err(e),
        };

        let stored = entity.get_str("passwordHash")?.unwrap_or_default();
        let matches: bool = stored.as_bytes().ct_eq(credential_hash.as_bytes()).into();
        if !matches {
            return Err(Self::rejected());
        }

        users.load_components(&self.registry, &mut entity, Some(EntityKind::Role))?;
        let mut user = User::try_from(entity)?;

        if let Some(name) = &self.default_role {
            if !user.role_names().iter().any(|r| r == name) {
                let roles = self.registry.component_mapper(EntityKind::Role)?;
                match roles.load_model(&Criteria::new().with("name", name.as_str())) {
                    Ok(role) => user.add_role(Role::try_from(role)?).map(|_| ())?,
                    Err(e) if e.is_not_found() => {
                        tracing::warn!(role = %name, "Default role does not exist")
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(user)
    }
}

impl Authenticator for StoreAuthenticator {
    fn current_user(&self) -> Option<User> {
        self.session.lock().clone()
    }

    fn login(&self, username: &str, credential_hash: &str) -> Result<User, PariahError> {
        if self.session.lock().is_some() {
            return Err(PariahError::Authentication(
                "a user is already logged in".to_string(),
            ));
        }

        let user = self.load_user(username, credential_hash)?;

        let mut session = self.session.lock();
        if session.is_some() {
            return Err(PariahError::Authentication(
                "a user is already logged in".to_string(),
            ));
        }
        *session = Some(user.clone());
        tracing::info!(%username, roles = ?user.role_names(), "User logged in");
        Ok(user)
    }

    fn logout(&self) {
        if let Some(user) = self.session.lock().take() {
            tracing::info!(username = ?user.username(), "User logged out");
        }
    }
}
