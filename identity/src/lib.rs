//! # identity
//!
//! Protocol plumbing for every way a user can sign in to the portal:
//! - OAuth 2.0 / OpenID Connect authorization code flow (Google, GitHub) with PKCE
//!   and one-time CSRF state
//! - AAF Rapid Connect signed assertions (federated SSO)
//!
//! Nothing here knows about local users. Each successful exchange ends with the
//! provider's raw attribute mapping, which the `domain` crate normalizes and
//! provisions from.

pub mod aaf;
pub mod error;
pub mod oauth;

pub use error::{Error, ErrorKind};

/// A provider's raw attribute mapping, exactly as it was returned.
pub type Attributes = serde_json::Map<String, serde_json::Value>;
