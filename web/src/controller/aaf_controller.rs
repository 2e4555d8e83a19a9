//! Controller for AAF Rapid Connect federated sign-in.
//!
//! This path runs alongside the OAuth flow: the federation authenticates the user
//! and POSTs a signed assertion to the configured callback URL.

use crate::error::{Error as WebError, Result as WebResult};
use crate::AppState;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use domain::user::{AuthSession, Credentials};
use log::*;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AafAssertion {
    pub assertion: String,
}

/// GET /login/aaf
///
/// Sends the browser to this service's Rapid Connect login URL.
#[utoipa::path(
    get,
    path = "/login/aaf",
    responses(
        (status = 303, description = "Redirect to AAF Rapid Connect"),
        (status = 404, description = "AAF login is not configured"),
    )
)]
pub async fn login(State(app_state): State<AppState>) -> Response {
    match app_state.config().aaf_login_url() {
        Some(url) => Redirect::to(&url).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// POST to the path of the configured AAF callback URL
///
/// Verifies the posted assertion, provisions the local user and starts the session.
/// A rejected assertion answers 401 without detail; an unavailable user directory
/// answers 503.
///
/// The route is mounted at the path of `aaf_callback_url`. The documented path is
/// that setting's default and does not follow a configured override.
#[utoipa::path(
    post,
    path = "/login/aaf/callback",
    request_body(content = String, content_type = "application/x-www-form-urlencoded", description = "`assertion`: the signed Rapid Connect JWT"),
    responses(
        (status = 303, description = "Redirect to the front-end's /login/loggedIn page"),
        (status = 401, description = "Authentication failed"),
        (status = 503, description = "User directory unavailable"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    mut auth_session: AuthSession,
    form: Result<Form<AafAssertion>, FormRejection>,
) -> WebResult<Redirect> {
    let Form(AafAssertion { assertion }) = form.map_err(|e| {
        error!("AAF Authentication failed: {e}");
        WebError::authentication_failed(e)
    })?;

    let user = match auth_session
        .authenticate(Credentials::Aaf { assertion })
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            error!("AAF Authentication failed: no user for a verified assertion");
            return Err(WebError::from(
                domain::error::Error::authentication_rejected("no user for a verified assertion"),
            ));
        }
        Err(axum_login::Error::Backend(e)) => {
            error!("AAF Authentication failed: {e}");
            return Err(WebError::from(e));
        }
        Err(e) => {
            error!("AAF Authentication failed: {e}");
            return Err(WebError::authentication_failed(e));
        }
    };

    auth_session.login(&user).await.map_err(|e| {
        error!("AAF Authentication failed: session login for user {}: {e}", user.id);
        WebError::authentication_failed(e)
    })?;

    info!("User {} signed in with AAF", user.id);
    Ok(Redirect::to(&format!(
        "{}/login/loggedIn",
        app_state.config().frontend_url()
    )))
}
