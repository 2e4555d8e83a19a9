//! Login-time business rules: normalizing what identity providers report about a
//! user, resolving roles and provisioning the local user record.
//!
//! Consumers of the `domain` crate do not need to depend on `entity_api` or
//! `identity` directly; the items they need are re-exported here.

// Re-exports from `entity` crate via `entity_api`
pub use entity_api::{authentication_framework, user_roles, users, Id};

pub use identity::oauth::{PkceVerifier, ProviderKind, Registry, StateManager};

pub mod error;
pub mod provisioning;
pub mod role;
pub mod user;
pub mod user_info;
