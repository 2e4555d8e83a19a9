//! Authorization code flow client shared by every OAuth provider.

use std::time::Duration;

use log::*;
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{AuthorizationRequest, PkceChallenge, ProviderEndpoints, ProviderKind, Tokens};
use crate::error::{oauth_error, Error, OAuthErrorKind};
use crate::Attributes;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth client for one identity provider.
///
/// Provider differences are data (endpoints, scopes) plus the few request headers
/// GitHub insists on; there is no per-provider type.
pub struct Client {
    kind: ProviderKind,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    auth_url: Url,
    endpoints: ProviderEndpoints,
    http_client: reqwest::Client,
}

impl Client {
    /// Creates a client against the provider's well-known endpoints.
    pub fn new(
        kind: ProviderKind,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Result<Self, Error> {
        Self::with_endpoints(
            kind,
            client_id,
            client_secret,
            redirect_uri,
            ProviderEndpoints::for_provider(kind),
        )
    }

    pub fn with_endpoints(
        kind: ProviderKind,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        endpoints: ProviderEndpoints,
    ) -> Result<Self, Error> {
        let auth_url = Url::parse(&endpoints.auth_url).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::ErrorKind::OAuth(OAuthErrorKind::InvalidEndpoint),
        })?;

        let http_client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("vgl-portal/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            kind,
            client_id,
            client_secret: SecretString::new(client_secret),
            redirect_uri,
            auth_url,
            endpoints,
            http_client,
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Builds the URL the browser is redirected to in order to sign in at the provider.
    pub fn authorization_url(
        &self,
        state: &str,
        pkce_challenge: &PkceChallenge,
    ) -> AuthorizationRequest {
        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.endpoints.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("code_challenge", pkce_challenge.as_str())
            .append_pair("code_challenge_method", "S256");

        AuthorizationRequest {
            url: url.into(),
            state: state.to_string(),
        }
    }

    /// Exchanges the authorization code from the callback for tokens.
    pub async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<Tokens, Error> {
        debug!("Exchanging {} authorization code for tokens", self.kind);

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret().as_str()),
            ("code_verifier", pkce_verifier),
        ];

        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.map_err(|e| {
            warn!("Failed to parse {} token response: {:?}", self.kind, e);
            Error {
                source: Some(Box::new(e)),
                error_kind: crate::ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
            }
        })?;

        // GitHub reports a bad code with a 200 and an `error` member
        if !status.is_success() || body.get("error").is_some() {
            let description = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or("token endpoint rejected the code")
                .to_string();
            warn!("{} token exchange failed ({status}): {description}", self.kind);
            return Err(oauth_error(OAuthErrorKind::TokenExchangeFailed, &description));
        }

        let tokens: Tokens = serde_json::from_value(body).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
        })?;

        info!("Exchanged {} authorization code for tokens", self.kind);
        Ok(tokens)
    }

    /// Fetches the signed-in user's raw attributes from the user-info endpoint.
    pub async fn fetch_attributes(&self, access_token: &str) -> Result<Attributes, Error> {
        let accept = match self.kind {
            ProviderKind::Github => "application/vnd.github+json",
            ProviderKind::Google => "application/json",
        };

        let response = self
            .http_client
            .get(&self.endpoints.userinfo_url)
            .header(ACCEPT, accept)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("{} user info request failed ({status}): {error_text}", self.kind);
            return Err(oauth_error(OAuthErrorKind::UserInfoFailed, &error_text));
        }

        response.json::<Attributes>().await.map_err(|e| {
            warn!("Failed to parse {} user info: {:?}", self.kind, e);
            Error {
                source: Some(Box::new(e)),
                error_kind: crate::ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::PkceVerifier;
    use crate::ErrorKind;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client_for(server_url: &str, kind: ProviderKind) -> Client {
        Client::with_endpoints(
            kind,
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://portal.example.org/login/oauth2/code/github".to_string(),
            ProviderEndpoints {
                auth_url: format!("{server_url}/login/oauth/authorize"),
                token_url: format!("{server_url}/login/oauth/access_token"),
                userinfo_url: format!("{server_url}/user"),
                scopes: vec!["read:user".to_string(), "user:email".to_string()],
            },
        )
        .unwrap()
    }

    #[test]
    fn authorization_url_carries_state_and_pkce_challenge() {
        let client = Client::new(
            ProviderKind::Google,
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://portal.example.org/login/oauth2/code/google".to_string(),
        )
        .unwrap();
        let challenge = PkceVerifier::generate().challenge();

        let request = client.authorization_url("state-123", &challenge);
        let url = Url::parse(&request.url).unwrap();
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(request.state, "state-123");
        assert_eq!(query["state"], "state-123");
        assert_eq!(query["client_id"], "client-id");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["scope"], "openid email profile");
        assert_eq!(query["code_challenge"], challenge.as_str());
        assert_eq!(query["code_challenge_method"], "S256");
    }

    #[test]
    fn invalid_authorization_endpoint_is_rejected() {
        let result = Client::with_endpoints(
            ProviderKind::Github,
            "id".to_string(),
            "secret".to_string(),
            "https://portal.example.org/cb".to_string(),
            ProviderEndpoints {
                auth_url: "not a url".to_string(),
                ..ProviderEndpoints::for_provider(ProviderKind::Github)
            },
        );

        assert_eq!(
            result.err().map(|e| e.error_kind),
            Some(ErrorKind::OAuth(OAuthErrorKind::InvalidEndpoint))
        );
    }

    #[tokio::test]
    async fn exchange_code_posts_the_code_and_verifier() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/login/oauth/access_token")
            .match_header("accept", "application/json")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "the-code".into()),
                Matcher::UrlEncoded("code_verifier".into(), "the-verifier".into()),
                Matcher::UrlEncoded("client_secret".into(), "client-secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"access_token": "gho_token", "token_type": "bearer"}).to_string())
            .create_async()
            .await;

        let client = client_for(&server.url(), ProviderKind::Github);
        let tokens = client.exchange_code("the-code", "the-verifier").await.unwrap();

        assert_eq!(tokens.access_token, "gho_token");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn exchange_code_treats_an_error_body_as_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/login/oauth/access_token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "error": "bad_verification_code",
                    "error_description": "The code passed is incorrect or expired."
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server.url(), ProviderKind::Github);
        let err = client.exchange_code("stale", "verifier").await.unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed)
        );
    }

    #[tokio::test]
    async fn fetch_attributes_returns_the_raw_mapping() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/user")
            .match_header("authorization", "Bearer gho_token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"id": 42, "login": "ada", "name": "Ada", "email": null}).to_string())
            .create_async()
            .await;

        let client = client_for(&server.url(), ProviderKind::Github);
        let attributes = client.fetch_attributes("gho_token").await.unwrap();

        assert_eq!(attributes["id"], json!(42));
        assert_eq!(attributes["email"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn fetch_attributes_fails_on_an_unauthorized_token() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/user")
            .with_status(401)
            .with_body("Bad credentials")
            .create_async()
            .await;

        let client = client_for(&server.url(), ProviderKind::Github);
        let err = client.fetch_attributes("revoked").await.unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::OAuth(OAuthErrorKind::UserInfoFailed));
    }
}
