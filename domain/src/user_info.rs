//! Uniform access to the id, name and email of a user as reported by an external
//! identity provider.
//!
//! Every provider spells these attributes differently. The adapters below read the
//! raw attribute mapping without copying it and never perform I/O.

use crate::authentication_framework::AuthenticationFramework;
use crate::error::Error;
use identity::Attributes;
use serde_json::Value;

pub trait ProviderUserInfo {
    /// The provider's stable subject id for this user.
    fn id(&self) -> Result<String, Error>;

    /// A human readable name, when the provider shares one.
    fn name(&self) -> Option<String>;

    fn email(&self) -> Result<String, Error>;
}

/// A successfully authenticated external user, before any local record is involved.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderUser {
    pub framework: AuthenticationFramework,
    pub attributes: Attributes,
}

impl ProviderUser {
    pub fn new(framework: AuthenticationFramework, attributes: Attributes) -> Self {
        Self {
            framework,
            attributes,
        }
    }

    pub fn user_info(&self) -> UserInfo<'_> {
        self.framework.user_info(&self.attributes)
    }
}

/// Selects the attribute adapter for a framework.
pub trait FrameworkUserInfo {
    fn user_info<'a>(&self, attributes: &'a Attributes) -> UserInfo<'a>;
}

impl FrameworkUserInfo for AuthenticationFramework {
    fn user_info<'a>(&self, attributes: &'a Attributes) -> UserInfo<'a> {
        match self {
            AuthenticationFramework::Google => UserInfo::Google(GoogleUserInfo(attributes)),
            AuthenticationFramework::Github => UserInfo::Github(GithubUserInfo(attributes)),
            AuthenticationFramework::Aaf => UserInfo::Aaf(AafUserInfo(attributes)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum UserInfo<'a> {
    Google(GoogleUserInfo<'a>),
    Github(GithubUserInfo<'a>),
    Aaf(AafUserInfo<'a>),
}

impl ProviderUserInfo for UserInfo<'_> {
    fn id(&self) -> Result<String, Error> {
        match self {
            UserInfo::Google(info) => info.id(),
            UserInfo::Github(info) => info.id(),
            UserInfo::Aaf(info) => info.id(),
        }
    }

    fn name(&self) -> Option<String> {
        match self {
            UserInfo::Google(info) => info.name(),
            UserInfo::Github(info) => info.name(),
            UserInfo::Aaf(info) => info.name(),
        }
    }

    fn email(&self) -> Result<String, Error> {
        match self {
            UserInfo::Google(info) => info.email(),
            UserInfo::Github(info) => info.email(),
            UserInfo::Aaf(info) => info.email(),
        }
    }
}

/// OpenID Connect claims: `sub`, `name`, `email`.
#[derive(Debug, Clone, Copy)]
pub struct GoogleUserInfo<'a>(pub &'a Attributes);

impl ProviderUserInfo for GoogleUserInfo<'_> {
    fn id(&self) -> Result<String, Error> {
        required_text(self.0, "sub")
    }

    fn name(&self) -> Option<String> {
        text(self.0, "name")
    }

    fn email(&self) -> Result<String, Error> {
        required_text(self.0, "email")
    }
}

/// GitHub REST `/user`: numeric `id`, `name` (often unset) or `login`, and the
/// public `email`, which is `null` unless the user published one.
#[derive(Debug, Clone, Copy)]
pub struct GithubUserInfo<'a>(pub &'a Attributes);

impl ProviderUserInfo for GithubUserInfo<'_> {
    fn id(&self) -> Result<String, Error> {
        match self.0.get("id") {
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => required_text(self.0, "id"),
        }
    }

    fn name(&self) -> Option<String> {
        text(self.0, "name").or_else(|| text(self.0, "login"))
    }

    fn email(&self) -> Result<String, Error> {
        required_text(self.0, "email")
    }
}

/// AAF Rapid Connect attributes: `edupersontargetedid`, `displayname` or `cn`, `mail`.
#[derive(Debug, Clone, Copy)]
pub struct AafUserInfo<'a>(pub &'a Attributes);

impl ProviderUserInfo for AafUserInfo<'_> {
    fn id(&self) -> Result<String, Error> {
        required_text(self.0, "edupersontargetedid")
    }

    fn name(&self) -> Option<String> {
        text(self.0, "displayname").or_else(|| text(self.0, "cn"))
    }

    fn email(&self) -> Result<String, Error> {
        required_text(self.0, "mail")
    }
}

// Absent, null and blank are all treated as "not supplied".
fn text(attributes: &Attributes, key: &str) -> Option<String> {
    match attributes.get(key)? {
        Value::String(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

fn required_text(attributes: &Attributes, key: &str) -> Result<String, Error> {
    text(attributes, key).ok_or_else(|| Error::attribute_missing(key))
}
