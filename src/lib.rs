//! Pariah - entity mapping and resource access control
//!
//! Entities with whitelisted fields and typed components are loaded from
//! and saved to a row store through mappers resolved by a
//! [`mapper::MapperRegistry`]. On top of that entity graph,
//! [`access::ResourceAcl`] answers allow/deny queries from the rules
//! attached to a resource and its ancestors.

pub mod access;
pub mod errors;
pub mod inflector;
pub mod mapper;
pub mod model;
pub mod settings;
pub mod storage;
