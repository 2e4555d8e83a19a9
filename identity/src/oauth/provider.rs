//! OAuth provider kinds and their endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{oauth_error, Error, OAuthErrorKind};

/// Identity providers reachable through the authorization code flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Google,
    Github,
}

impl ProviderKind {
    /// The provider's path segment, as in `/oauth2/authorization/{provider}`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Github => "github",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "google" => Ok(ProviderKind::Google),
            "github" => Ok(ProviderKind::Github),
            other => Err(oauth_error(
                OAuthErrorKind::UnknownProvider,
                &format!("unknown identity provider `{other}`"),
            )),
        }
    }
}

/// Where a provider's authorization, token and user-info endpoints live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
}

impl ProviderEndpoints {
    pub fn for_provider(kind: ProviderKind) -> Self {
        match kind {
            // OpenID Connect: the userinfo endpoint returns the `sub` claim
            ProviderKind::Google => Self {
                auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
                scopes: vec!["openid".into(), "email".into(), "profile".into()],
            },
            ProviderKind::Github => Self {
                auth_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: "https://github.com/login/oauth/access_token".to_string(),
                userinfo_url: "https://api.github.com/user".to_string(),
                scopes: vec!["read:user".into(), "user:email".into()],
            },
        }
    }
}

/// Authorization request with URL and state management data.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to redirect the user to.
    pub url: String,
    /// CSRF state parameter for validation.
    pub state: String,
}

/// Token endpoint response. Only the access token is needed to read user info.
#[derive(Debug, Clone, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_round_trips_through_its_path_segment() {
        for kind in [ProviderKind::Google, ProviderKind::Github] {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
        assert_eq!("GitHub".parse::<ProviderKind>().unwrap(), ProviderKind::Github);
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let err = "facebook".parse::<ProviderKind>().unwrap_err();
        assert_eq!(
            err.error_kind,
            crate::ErrorKind::OAuth(OAuthErrorKind::UnknownProvider)
        );
    }

    #[test]
    fn google_requests_openid_scopes() {
        let endpoints = ProviderEndpoints::for_provider(ProviderKind::Google);
        assert!(endpoints.scopes.contains(&"openid".to_string()));
        assert!(endpoints.scopes.contains(&"email".to_string()));
    }
}
