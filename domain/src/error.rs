//! Error types for the `domain` layer.
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use identity::error::{Error as IdentityError, ErrorKind as IdentityErrorKind};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries. Ex. `domain` is dependent on `entity_api` and `identity`, and `web`
/// is dependent on `domain`, but `web` should not be dependent, directly, on either of
/// the lower layers. Ultimately the various `error_kind`s are used by `web` to decide
/// between redirects and HTTP status codes.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
    Authentication(AuthenticationErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    Config,
    Other(String),
}

/// Enum representing the various kinds of entity errors that can bubble up from the "Entity" layer (`entity_api` and `entity`).
/// These errors are translated from the `entity_api` layer to the `domain` layer and reduced to a subset of error kinds
/// that are relevant to the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    Invalid,
    Conflict,
    DbTransaction,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Other(String),
}

/// Ways an external login can fail. None of them grants a session.
#[derive(Debug, PartialEq)]
pub enum AuthenticationErrorKind {
    /// The provider did not supply a required attribute (`email` or `id`).
    ProviderAttributeMissing(String),
    /// The user directory failed while looking up or creating the local user.
    UserProvisioningFailure,
    /// The provider flow itself failed: bad state, failed code exchange or an
    /// invalid federated assertion.
    AuthenticationRejected,
}

impl Error {
    pub fn attribute_missing(attribute: &str) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Authentication(
                AuthenticationErrorKind::ProviderAttributeMissing(attribute.to_string()),
            ),
        }
    }

    pub fn authentication_rejected(reason: &str) -> Self {
        Error {
            source: Some(reason.to_string().into()),
            error_kind: DomainErrorKind::Authentication(
                AuthenticationErrorKind::AuthenticationRejected,
            ),
        }
    }

    pub(crate) fn provisioning_failure(err: EntityApiError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Authentication(
                AuthenticationErrorKind::UserProvisioningFailure,
            ),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api` layer to the `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let entity_error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound => EntityErrorKind::NotFound,
            EntityApiErrorKind::InvalidQueryTerm => EntityErrorKind::Invalid,
            EntityApiErrorKind::RecordConflict => EntityErrorKind::Conflict,
            EntityApiErrorKind::SystemError => EntityErrorKind::DbTransaction,
            _ => EntityErrorKind::Other("EntityErrorKind".to_string()),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)),
        }
    }
}

// Protocol failures reject the login; transport failures are reported as such so
// operators can tell a provider outage from a bad login.
impl From<IdentityError> for Error {
    fn from(err: IdentityError) -> Self {
        let error_kind = match &err.error_kind {
            IdentityErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
            IdentityErrorKind::OAuth(_) | IdentityErrorKind::Aaf(_) => {
                DomainErrorKind::Authentication(AuthenticationErrorKind::AuthenticationRejected)
            }
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use identity::error::{aaf_error, oauth_error, AafErrorKind, OAuthErrorKind};

    #[test]
    fn conflicting_records_stay_distinguishable() {
        let err: Error = EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::RecordConflict,
        }
        .into();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Conflict))
        );
    }

    #[test]
    fn provider_protocol_failures_reject_the_login() {
        for identity_err in [
            oauth_error(OAuthErrorKind::TokenExchangeFailed, "bad code"),
            aaf_error(AafErrorKind::ReplayedAssertion, "seen before"),
        ] {
            let err: Error = identity_err.into();
            assert_eq!(
                err.error_kind,
                DomainErrorKind::Authentication(AuthenticationErrorKind::AuthenticationRejected)
            );
        }
    }

    #[test]
    fn missing_attribute_names_the_attribute() {
        let err = Error::attribute_missing("email");

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Authentication(AuthenticationErrorKind::ProviderAttributeMissing(
                "email".to_string()
            ))
        );
        assert!(err.source.is_none());
    }
}
