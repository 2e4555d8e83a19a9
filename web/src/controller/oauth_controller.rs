//! Controller for the OAuth2 / OpenID Connect login flow (Google, GitHub).
//!
//! Both endpoints are reached through browser redirects, so every outcome is a
//! redirect as well: to the provider, to the front-end's logged-in page, or back to
//! the front-end's login page with an `error` flag.

use crate::AppState;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use domain::user::{AuthSession, Credentials};
use domain::{PkceVerifier, ProviderKind};
use log::*;
use serde::Deserialize;

/// Query parameters the provider appends to the callback URL.
#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user declined or the provider failed.
    pub error: Option<String>,
}

/// GET /oauth2/authorization/{provider}
///
/// Starts a login: remembers a fresh CSRF state with its PKCE verifier and redirects
/// the browser to the provider's consent page.
#[utoipa::path(
    get,
    path = "/oauth2/authorization/{provider}",
    params(
        ("provider" = String, Path, description = "Identity provider: `google` or `github`"),
    ),
    responses(
        (status = 307, description = "Redirect to the provider's authorization endpoint"),
        (status = 404, description = "Unknown or unconfigured provider"),
    )
)]
pub async fn authorize(
    State(app_state): State<AppState>,
    Path(provider): Path<String>,
) -> Response {
    let Some((kind, client)) = provider
        .parse::<ProviderKind>()
        .ok()
        .and_then(|kind| app_state.registry.get(kind).map(|client| (kind, client)))
    else {
        debug!("Login requested for unavailable provider `{provider}`");
        return StatusCode::NOT_FOUND.into_response();
    };

    let pkce_verifier = PkceVerifier::generate();
    let pkce_challenge = pkce_verifier.challenge();
    let state = app_state
        .oauth_states
        .generate(kind, pkce_verifier.into_string());

    let request = client.authorization_url(&state, &pkce_challenge);
    debug!("Redirecting to {kind} for authorization");
    Redirect::temporary(&request.url).into_response()
}

/// GET /login/oauth2/code/{provider}
///
/// Completes a login: checks the one-time state, exchanges the code, provisions the
/// local user and starts the session.
#[utoipa::path(
    get,
    path = "/login/oauth2/code/{provider}",
    params(
        ("provider" = String, Path, description = "Identity provider: `google` or `github`"),
        ("code" = Option<String>, Query, description = "Authorization code from the provider"),
        ("state" = Option<String>, Query, description = "CSRF state issued by /oauth2/authorization/{provider}"),
        ("error" = Option<String>, Query, description = "Provider error, set when the user declined"),
    ),
    responses(
        (status = 303, description = "Redirect to the front-end: /login/loggedIn on success, /login?error on failure"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    mut auth_session: AuthSession,
    Path(provider): Path<String>,
    params: Result<Query<OAuthCallback>, QueryRejection>,
) -> Redirect {
    let frontend_url = app_state.config().frontend_url();
    let failure = Redirect::to(&format!("{frontend_url}/login?error"));

    let Ok(kind) = provider.parse::<ProviderKind>() else {
        warn!("OAuth callback for unknown provider `{provider}`");
        return failure;
    };

    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            warn!("{kind} callback with an unreadable query: {rejection}");
            return failure;
        }
    };

    if let Some(error) = params.error {
        warn!("{kind} login failed at the provider: {error}");
        return failure;
    }

    let (Some(code), Some(state)) = (params.code, params.state) else {
        warn!("{kind} callback is missing the code or state");
        return failure;
    };

    let Some(state_data) = app_state.oauth_states.consume(&state, kind) else {
        warn!("{kind} callback with an unknown, expired or reused state");
        return failure;
    };

    let credentials = Credentials::OAuth {
        provider: kind,
        code,
        pkce_verifier: state_data.pkce_verifier,
    };

    let user = match auth_session.authenticate(credentials).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("{kind} authentication produced no user");
            return failure;
        }
        Err(e) => {
            warn!("{kind} authentication failed: {e:?}");
            return failure;
        }
    };

    if let Err(e) = auth_session.login(&user).await {
        error!("Session login failed for user {}: {e:?}", user.id);
        return failure;
    }

    info!("User {} signed in with {kind}", user.id);
    Redirect::to(&format!("{frontend_url}/login/loggedIn"))
}
