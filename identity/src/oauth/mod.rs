//! OAuth 2.0 / OpenID Connect authorization code flow.
//!
//! Builds the provider redirect (with PKCE and CSRF state), exchanges the returned
//! code for tokens and fetches the signed-in user's raw attributes.

mod client;
mod pkce;
mod provider;
mod registry;
mod state;

pub use client::Client;
pub use pkce::{PkceChallenge, PkceVerifier};
pub use provider::{AuthorizationRequest, ProviderEndpoints, ProviderKind, Tokens};
pub use registry::Registry;
pub use state::{StateData, StateManager};
