use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::Router;
use axum_login::AuthManagerLayerBuilder;
use domain::user::Backend;
use domain::{Registry, StateManager};
use log::*;
use sea_orm::DatabaseConnection;
use service::config::Config;
use time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

pub use error::{Error, Result};
pub use middleware::security_policy::SecurityPolicy;

mod controller;
mod error;
mod extractors;
mod middleware;
pub mod router;

/// Shared state handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub service: service::AppState,
    /// CSRF state and PKCE verifiers of logins in flight.
    pub oauth_states: StateManager,
    pub registry: Arc<Registry>,
    pub policy: Arc<SecurityPolicy>,
}

impl AppState {
    pub fn new(service: service::AppState, registry: Arc<Registry>) -> Self {
        let policy = Arc::new(SecurityPolicy::from_config(&service.config));
        Self {
            service,
            oauth_states: StateManager::new(),
            registry,
            policy,
        }
    }

    pub fn config(&self) -> &Config {
        &self.service.config
    }

    pub fn db_conn_ref(&self) -> &DatabaseConnection {
        self.service.db_conn_ref()
    }
}

/// Assembles routes, the security policy, authentication and CORS around any session store.
pub fn app<S>(app_state: AppState, backend: Backend, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let cors = cors_layer(app_state.config());
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    router::define_routes(app_state.clone())
        .layer(from_fn_with_state(
            app_state,
            middleware::security_policy::enforce,
        ))
        .layer(auth_layer)
        .layer(cors)
}

pub async fn init_server(
    service_state: service::AppState,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = service_state.config.clone();
    let backend = Backend::from_config(&service_state.database_connection, &config)?;
    let app_state = AppState::new(service_state, backend.registry());

    // Sessions live next to the portal's own tables
    let session_store = PostgresStore::new(
        app_state
            .db_conn_ref()
            .get_postgres_connection_pool()
            .clone(),
    )
    .with_schema_name("vgl_portal")?
    .with_table_name("authorized_sessions")?;
    session_store.migrate().await?;

    let session_layer = session_layer(session_store, &config);
    let app = app(app_state, backend, session_layer);

    let server_url = format!(
        "{}:{}",
        config.interface.as_deref().unwrap_or("127.0.0.1"),
        config.port
    );
    let listener = TcpListener::bind(&server_url).await?;
    info!("Server starting... listening for connections on http://{server_url}");

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn session_layer<S: SessionStore>(store: S, config: &Config) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_secure(config.is_production())
        // The provider redirects back cross-site, so Strict would drop the cookie
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            config.backend_session_expiry_seconds as i64,
        )))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
