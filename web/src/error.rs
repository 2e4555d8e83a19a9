use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use domain::error::{
    AuthenticationErrorKind, DomainErrorKind, EntityErrorKind, Error as DomainError,
    ExternalErrorKind, InternalErrorKind,
};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl Error {
    /// A failed login. The cause is kept for logging but never reaches the client.
    pub fn authentication_failed<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(DomainError {
            source: Some(Box::new(source)),
            error_kind: DomainErrorKind::Authentication(
                AuthenticationErrorKind::AuthenticationRejected,
            ),
        })
    }
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Entity(entity_error_kind) => match entity_error_kind {
                    EntityErrorKind::NotFound => {
                        (StatusCode::NOT_FOUND, "NOT FOUND").into_response()
                    }
                    EntityErrorKind::Invalid => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE ENTITY").into_response()
                    }
                    EntityErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT").into_response(),
                    EntityErrorKind::DbTransaction | EntityErrorKind::Other(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                    }
                },
                InternalErrorKind::Config | InternalErrorKind::Other(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::Network => {
                    (StatusCode::BAD_GATEWAY, "BAD GATEWAY").into_response()
                }
                ExternalErrorKind::Other(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
            },
            // Login failures never say which check failed
            DomainErrorKind::Authentication(authentication_error_kind) => {
                match authentication_error_kind {
                    AuthenticationErrorKind::ProviderAttributeMissing(attribute) => {
                        debug!("Login rejected, provider did not supply `{attribute}`");
                        (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response()
                    }
                    AuthenticationErrorKind::AuthenticationRejected => {
                        (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response()
                    }
                    AuthenticationErrorKind::UserProvisioningFailure => {
                        (StatusCode::SERVICE_UNAVAILABLE, "SERVICE UNAVAILABLE").into_response()
                    }
                }
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error_kind: DomainErrorKind) -> StatusCode {
        Error(DomainError {
            source: None,
            error_kind,
        })
        .into_response()
        .status()
    }

    #[test]
    fn login_failures_map_to_unauthorized() {
        assert_eq!(
            status_of(DomainErrorKind::Authentication(
                AuthenticationErrorKind::AuthenticationRejected
            )),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(DomainErrorKind::Authentication(
                AuthenticationErrorKind::ProviderAttributeMissing("email".to_string())
            )),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn provisioning_failure_is_a_server_side_problem() {
        assert_eq!(
            status_of(DomainErrorKind::Authentication(
                AuthenticationErrorKind::UserProvisioningFailure
            )),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn provider_outage_maps_to_bad_gateway() {
        assert_eq!(
            status_of(DomainErrorKind::External(ExternalErrorKind::Network)),
            StatusCode::BAD_GATEWAY
        );
    }
}
