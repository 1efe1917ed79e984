// Integration tests for the store-backed authenticator
//
// These tests verify:
// 1. Credential checks and the single-session rule
// 2. Role loading, including the configured default role
// 3. Logged-in users as ACL principals

mod helpers;

use std::sync::Arc;

use helpers::{seed_action, test_mapping, ResourceBuilder, RoleBuilder, RuleBuilder, UserBuilder};
use pariah::access::{Authenticator, Principal, ResourceAcl, ResourceId, StoreAuthenticator};
use pariah::errors::PariahError;
use pariah::mapper::MapperRegistry;
use pariah::model::EntityKind;
use pariah::settings::Authorization;
use pariah::storage::MemoryStore;

struct Fixture {
    store: Arc<MemoryStore>,
    registry: Arc<MapperRegistry>,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(MapperRegistry::new(store.clone(), test_mapping()));

    let admin = RoleBuilder::new("Admin").create(&*store);
    RoleBuilder::new("Guest").create(&*store);
    UserBuilder::new("ada")
        .with_password_hash("s3cret")
        .role(&admin)
        .create(&*store);
    UserBuilder::new("bob").create(&*store);

    Fixture { store, registry }
}

fn authenticator(f: &Fixture, default_role: Option<&str>) -> StoreAuthenticator {
    StoreAuthenticator::new(
        f.registry.clone(),
        &Authorization {
            default_role: default_role.map(str::to_string),
        },
    )
}

#[test]
fn test_login_checks_credentials() {
    let f = fixture();
    let auth = authenticator(&f, None);

    let err = auth.login("ada", "wrong").unwrap_err();
    assert!(matches!(err, PariahError::Authentication(_)));
    let err = auth.login("nobody", "s3cret").unwrap_err();
    assert!(matches!(err, PariahError::Authentication(_)));
    assert!(auth.current_user().is_none());

    let user = auth.login("ada", "s3cret").expect("Login succeeds");
    assert_eq!(user.username(), Some("ada"));
    assert_eq!(user.role_names(), vec!["Admin"]);
    assert_eq!(auth.current_user(), Some(user));
}

#[test]
fn test_single_session() {
    let f = fixture();
    let auth = authenticator(&f, None);

    auth.login("ada", "s3cret").expect("Login succeeds");
    let err = auth.login("bob", "hash123").unwrap_err();
    assert!(matches!(err, PariahError::Authentication(_)));

    auth.logout();
    assert!(auth.current_user().is_none());
    let bob = auth.login("bob", "hash123").expect("Login succeeds");
    assert_eq!(bob.username(), Some("bob"));
}

#[test]
fn test_default_role_is_attached() {
    let f = fixture();
    let auth = authenticator(&f, Some("Guest"));
    let ada = auth.login("ada", "s3cret").expect("Login succeeds");
    assert_eq!(ada.role_names(), vec!["Admin", "Guest"]);

    // a missing default role is skipped
    let auth = authenticator(&f, Some("Visitor"));
    let bob = auth.login("bob", "hash123").expect("Login succeeds");
    assert!(bob.role_names().is_empty());
}

#[test]
fn test_logged_in_user_checks_acl() {
    let f = fixture();
    let store = &*f.store;
    let admin_role = "1";
    let delete = seed_action(store, "delete");
    let rule = RuleBuilder::permit("admins")
        .role(admin_role)
        .action(&delete)
        .create(store);
    let resource = ResourceBuilder::new(EntityKind::Resource).rule(&rule).create(store);

    let auth = authenticator(&f, Some("Guest"));
    let ada = auth.login("ada", "s3cret").expect("Login succeeds");
    auth.logout();
    let bob = auth.login("bob", "hash123").expect("Login succeeds");

    let rid = ResourceId::new("Resource", resource).expect("Valid resource id");
    let acl = ResourceAcl::from_resource_id(&f.registry, &rid).expect("ACL builds");
    assert!(acl.is_allowed(&ada, "delete"));
    assert!(!acl.is_allowed(&bob, "delete"));
}
