use crate::authentication_framework::AuthenticationFramework;
use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use crate::provisioning::on_login_success;
use crate::role::RoleAssignment;
use crate::user_info::ProviderUser;
use crate::users;
use async_trait::async_trait;
use axum_login::{AuthnBackend, UserId};
use entity_api::error::EntityApiErrorKind;
use identity::aaf::AafVerifier;
use identity::oauth::{Client, ProviderKind, Registry};
use log::*;
use sea_orm::DatabaseConnection;
use secrecy::SecretString;
use service::config::Config;
use std::sync::Arc;

pub use entity_api::user::{find_by_email, find_by_framework_and_external_id, find_by_id};

/// What a login attempt presents to the backend.
#[derive(Clone)]
pub enum Credentials {
    /// An authorization code returned to the OAuth callback, with the PKCE verifier
    /// that was stored alongside its state.
    OAuth {
        provider: ProviderKind,
        code: String,
        pkce_verifier: String,
    },
    /// A signed assertion posted by AAF Rapid Connect.
    Aaf { assertion: String },
}

#[derive(Clone)]
pub struct Backend {
    db: Arc<DatabaseConnection>,
    registry: Arc<Registry>,
    aaf: Option<Arc<AafVerifier>>,
    role_assignment: Arc<RoleAssignment>,
}

impl Backend {
    pub fn new(
        db: &Arc<DatabaseConnection>,
        registry: Registry,
        aaf: Option<AafVerifier>,
        role_assignment: RoleAssignment,
    ) -> Self {
        Self {
            // Arc is cloned, but the source DatabaseConnection refers to the same instance
            // as the one passed in to new() (see the Arc documentation for more info)
            db: Arc::clone(db),
            registry: Arc::new(registry),
            aaf: aaf.map(Arc::new),
            role_assignment: Arc::new(role_assignment),
        }
    }

    /// Wires up every login path the configuration enables.
    pub fn from_config(db: &Arc<DatabaseConnection>, config: &Config) -> Result<Self, Error> {
        Ok(Self::new(
            db,
            registry_from_config(config)?,
            aaf_verifier_from_config(config),
            RoleAssignment::from_config(config),
        ))
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn aaf_enabled(&self) -> bool {
        self.aaf.is_some()
    }

    async fn provider_user(&self, creds: Credentials) -> Result<ProviderUser, Error> {
        match creds {
            Credentials::OAuth {
                provider,
                code,
                pkce_verifier,
            } => {
                let client = self.registry.get(provider).ok_or_else(|| {
                    Error::authentication_rejected(&format!("{provider} login is not configured"))
                })?;
                let tokens = client.exchange_code(&code, &pkce_verifier).await?;
                let attributes = client.fetch_attributes(&tokens.access_token).await?;
                Ok(ProviderUser::new(framework_for(provider), attributes))
            }
            Credentials::Aaf { assertion } => {
                let verifier = self
                    .aaf
                    .as_ref()
                    .ok_or_else(|| Error::authentication_rejected("AAF login is not configured"))?;
                let attributes = verifier.verify(&assertion)?;
                Ok(ProviderUser::new(AuthenticationFramework::Aaf, attributes))
            }
        }
    }
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = users::Model;
    type Credentials = Credentials;
    type Error = Error;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let provider_user = self.provider_user(creds).await?;
        let provisioned =
            on_login_success(self.db.as_ref(), &self.role_assignment, provider_user).await?;
        Ok(Some(provisioned.user))
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        match find_by_id(self.db.as_ref(), *user_id).await {
            Ok(user) => Ok(Some(user)),
            Err(err) if err.error_kind == EntityApiErrorKind::RecordNotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

pub type AuthSession = axum_login::AuthSession<Backend>;

/// The framework recorded for users who signed in through an OAuth provider.
pub fn framework_for(provider: ProviderKind) -> AuthenticationFramework {
    match provider {
        ProviderKind::Google => AuthenticationFramework::Google,
        ProviderKind::Github => AuthenticationFramework::Github,
    }
}

/// Registers an OAuth client for each provider that has both a client id and secret.
pub fn registry_from_config(config: &Config) -> Result<Registry, Error> {
    let mut registry = Registry::new();
    let credentials = [
        (
            ProviderKind::Google,
            config.google_client_id(),
            config.google_client_secret(),
        ),
        (
            ProviderKind::Github,
            config.github_client_id(),
            config.github_client_secret(),
        ),
    ];

    for (kind, client_id, client_secret) in credentials {
        match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) => {
                let client = Client::new(
                    kind,
                    client_id,
                    client_secret,
                    config.oauth_redirect_uri(kind.as_str()),
                )
                .map_err(|err| Error {
                    source: Some(Box::new(err)),
                    error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
                })?;
                info!("{kind} login enabled");
                registry = registry.register(client);
            }
            _ => info!("{kind} login disabled, no client credentials configured"),
        }
    }

    Ok(registry)
}

/// An assertion verifier when a Rapid Connect secret is configured.
pub fn aaf_verifier_from_config(config: &Config) -> Option<AafVerifier> {
    match config.aaf_jwt_secret() {
        Some(secret) => {
            info!("AAF login enabled, assertions accepted at {}", config.aaf_callback_url());
            Some(AafVerifier::new(
                SecretString::new(secret),
                config.aaf_issuer(),
                config.portal_url(),
            ))
        }
        None => {
            warn!("AAF login disabled, no AAF JWT secret configured");
            None
        }
    }
}


#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod backend_tests {
    use super::*;
    use crate::error::AuthenticationErrorKind;
    use crate::{user_roles, Id};
    use chrono::Utc;
    use identity::oauth::ProviderEndpoints;
    use mockito::Server;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    fn github_client(server_url: &str) -> Client {
        Client::with_endpoints(
            ProviderKind::Github,
            "gh-id".to_string(),
            "gh-secret".to_string(),
            "http://localhost:4000/login/oauth2/code/github".to_string(),
            ProviderEndpoints {
                auth_url: format!("{server_url}/login/oauth/authorize"),
                token_url: format!("{server_url}/login/oauth/access_token"),
                userinfo_url: format!("{server_url}/user"),
                scopes: vec!["read:user".to_string()],
            },
        )
        .unwrap()
    }

    fn ada() -> users::Model {
        let now = Utc::now();
        users::Model {
            id: Id::new_v4(),
            authentication_framework: AuthenticationFramework::Github,
            external_id: "42".to_string(),
            full_name: Some("Ada".to_string()),
            email: "ada@example.org".to_string(),
            created_at: now.into(),
            updated_at: now.into(),
            roles: vec![],
        }
    }

    fn role(user_id: Id, name: &str) -> user_roles::Model {
        let now = Utc::now();
        user_roles::Model {
            id: Id::new_v4(),
            user_id,
            name: name.to_string(),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn role_assignment() -> RoleAssignment {
        RoleAssignment::new("ROLE_USER", Vec::<(String, Vec<String>)>::new())
    }

    #[tokio::test]
    async fn github_login_exchanges_the_code_and_provisions_the_user() -> Result<(), Error> {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/login/oauth/access_token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"access_token": "gho_token", "token_type": "bearer"}).to_string())
            .create_async()
            .await;
        let _user = server
            .mock("GET", "/user")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"id": 42, "name": "Ada", "email": "ada@example.org"}).to_string())
            .create_async()
            .await;

        let user = ada();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<(users::Model, Option<user_roles::Model>)>::new()])
                .append_query_results([Vec::<(users::Model, Option<user_roles::Model>)>::new()])
                .append_query_results([[user.clone()]])
                .append_query_results([[role(user.id, "ROLE_USER")]])
                .into_connection(),
        );
        let backend = Backend::new(
            &db,
            Registry::new().register(github_client(&server.url())),
            None,
            role_assignment(),
        );

        let authenticated = backend
            .authenticate(Credentials::OAuth {
                provider: ProviderKind::Github,
                code: "the-code".to_string(),
                pkce_verifier: "the-verifier".to_string(),
            })
            .await?
            .unwrap();

        assert_eq!(authenticated.id, user.id);
        assert_eq!(authenticated.authentication_framework, AuthenticationFramework::Github);
        assert_eq!(authenticated.role_names(), vec!["ROLE_USER"]);

        Ok(())
    }

    #[tokio::test]
    async fn unconfigured_provider_is_rejected() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let backend = Backend::new(&db, Registry::new(), None, role_assignment());

        let result = backend
            .authenticate(Credentials::OAuth {
                provider: ProviderKind::Google,
                code: "code".to_string(),
                pkce_verifier: "verifier".to_string(),
            })
            .await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Authentication(AuthenticationErrorKind::AuthenticationRejected)
        );
    }

    #[tokio::test]
    async fn aaf_assertion_is_rejected_when_aaf_is_disabled() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let backend = Backend::new(&db, Registry::new(), None, role_assignment());

        let result = backend
            .authenticate(Credentials::Aaf {
                assertion: "eyJ...".to_string(),
            })
            .await;

        assert!(!backend.aaf_enabled());
        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Authentication(AuthenticationErrorKind::AuthenticationRejected)
        );
    }

    #[tokio::test]
    async fn get_user_returns_none_for_a_deleted_user() -> Result<(), Error> {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<(users::Model, Option<user_roles::Model>)>::new()])
                .into_connection(),
        );
        let backend = Backend::new(&db, Registry::new(), None, role_assignment());

        assert!(backend.get_user(&Id::new_v4()).await?.is_none());

        Ok(())
    }
}
