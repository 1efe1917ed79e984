#![allow(dead_code)]

pub mod builders;
pub mod db;

pub use builders::{seed_action, ResourceBuilder, RoleBuilder, RuleBuilder, UserBuilder};
pub use db::{row, test_mapping, TestDb, TestStore};
