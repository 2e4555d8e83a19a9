use crate::{
    controller::{
        aaf_controller, health_check_controller, oauth_controller, user_controller,
        user_session_controller,
    },
    AppState,
};
use axum::{
    routing::{get, post},
    Router,
};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "VGL Portal Authentication API"
        ),
        paths(
            aaf_controller::login,
            aaf_controller::callback,
            health_check_controller::health_check,
            oauth_controller::authorize,
            oauth_controller::callback,
            user_controller::read,
            user_session_controller::logout,
        ),
        components(
            schemas(
                domain::authentication_framework::AuthenticationFramework,
                domain::user_roles::Model,
                domain::users::Model,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "vgl_portal", description = "VGL portal sign-in and user provisioning")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines our cookie session based authentication requirement for gaining access to our
// API endpoints for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "id",
                    "Session id value returned from successful login via Set-Cookie header",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(oauth_routes(app_state.clone()))
        .merge(aaf_routes(app_state.clone()))
        .merge(user_session_routes(app_state.clone()))
        .merge(secure_routes())
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

/// Routes for the Google and GitHub authorization code flow
fn oauth_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/oauth2/authorization/{provider}",
            get(oauth_controller::authorize),
        )
        .route(
            "/login/oauth2/code/{provider}",
            get(oauth_controller::callback),
        )
        .with_state(app_state)
}

/// Routes for AAF Rapid Connect; the callback path follows the configured callback URL
fn aaf_routes(app_state: AppState) -> Router {
    let callback_path = aaf_callback_route(&app_state.config().aaf_callback_path());
    Router::new()
        .route("/login/aaf", get(aaf_controller::login))
        .route(&callback_path, post(aaf_controller::callback))
        .with_state(app_state)
}

fn user_session_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/logout", get(user_session_controller::logout))
        .with_state(app_state)
}

/// Everything here sits under the secured tree and is guarded by the security policy
fn secure_routes() -> Router {
    Router::new().route("/secure/user", get(user_controller::read))
}

fn aaf_callback_route(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
