pub use entity::{authentication_framework, user_roles, users, Id};

pub mod error;
pub mod user;
