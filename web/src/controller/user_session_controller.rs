use crate::AppState;
use axum::extract::State;
use axum::response::Redirect;
use domain::user::AuthSession;
use log::*;

/// Logs the user out by destroying their session, then returns the browser to the
/// front-end. Visiting it without a session is harmless.
#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 303, description = "Session ended, redirect to the front-end"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn logout(State(app_state): State<AppState>, mut auth_session: AuthSession) -> Redirect {
    trace!("UserSessionController::logout()");
    match auth_session.logout().await {
        Ok(Some(user)) => info!("User {} signed out", user.id),
        Ok(None) => debug!("Logout without an authenticated session"),
        Err(e) => warn!("Failed to end session on logout: {e:?}"),
    }

    Redirect::to(app_state.config().frontend_url())
}
