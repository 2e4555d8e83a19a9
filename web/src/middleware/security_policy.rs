//! Which paths need a signed-in user, and what happens when there is none.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use domain::user::AuthSession;
use log::*;
use service::config::Config;

use crate::AppState;

/// Paths under this pattern require authentication. Everything else is public.
pub const SECURED_PATTERN: &str = "/secure/**";

#[derive(Debug, Clone, PartialEq)]
pub struct SecurityPolicy {
    secured: Vec<String>,
    login_url: String,
}

impl SecurityPolicy {
    pub fn new(secured: Vec<String>, login_url: String) -> Self {
        Self { secured, login_url }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            vec![SECURED_PATTERN.to_string()],
            format!("{}/login", config.frontend_url()),
        )
    }

    /// Where unauthenticated requests for secured paths are sent.
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn requires_authentication(&self, path: &str) -> bool {
        let segments = normalize(path);
        self.secured
            .iter()
            .any(|pattern| ant_match(&segments_of(pattern), &segments))
    }
}

/// Redirects unauthenticated requests for secured paths to the login page. The
/// secured handler is never run for them.
pub async fn enforce(
    State(app_state): State<AppState>,
    auth_session: AuthSession,
    request: Request,
    next: Next,
) -> Response {
    let policy = &app_state.policy;
    if auth_session.user.is_none() && policy.requires_authentication(request.uri().path()) {
        debug!(
            "Unauthenticated request for {}, redirecting to login",
            request.uri().path()
        );
        return Redirect::to(policy.login_url()).into_response();
    }

    next.run(request).await
}

fn segments_of(pattern: &str) -> Vec<&str> {
    pattern.split('/').filter(|s| !s.is_empty()).collect()
}

// Resolves `.` and `..` so a secured path cannot be dressed up as a public one.
fn normalize(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments
}

/// Ant-style matching: `**` spans any number of segments, `*` matches within one.
fn ant_match(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => (0..=path.len()).any(|skip| ant_match(rest, &path[skip..])),
        Some((first, rest)) => match path.split_first() {
            Some((segment, path_rest)) => {
                segment_match(first, segment) && ant_match(rest, path_rest)
            }
            None => false,
        },
    }
}

fn segment_match(pattern: &str, segment: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == segment,
        Some((prefix, suffix)) => {
            segment.len() >= prefix.len() + suffix.len()
                && segment.starts_with(prefix)
                && segment.ends_with(suffix)
        }
    }
}
