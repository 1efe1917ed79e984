//! Resources, the role/rule/action permission graph, and ACL resolution.

pub mod acl;
pub mod resource;
pub mod resource_id;
pub mod role;
pub mod user;

use crate::errors::PariahError;
use crate::model::{Entity, EntityKind};

pub use acl::{ActionRef, ResourceAcl};
pub use resource::Resource;
pub use resource_id::ResourceId;
pub use role::{Action, Role, Rule, Verdict};
pub use user::{Authenticator, Principal, StoreAuthenticator, User};

fn expect_kind(entity: Entity, kind: EntityKind) -> Result<Entity, PariahError> {
    if entity.kind() != kind {
        return Err(PariahError::Structure(format!(
            "expected a {kind}, got a {}",
            entity.kind()
        )));
    }
    Ok(entity)
}
