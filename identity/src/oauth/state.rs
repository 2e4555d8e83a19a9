//! One-time CSRF state for the authorization code flow.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use super::ProviderKind;

/// What the login entry point remembers until the provider calls back.
#[derive(Debug, Clone)]
pub struct StateData {
    /// The provider the browser was sent to; a callback for any other provider is rejected.
    pub provider: ProviderKind,
    pub pkce_verifier: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and consumes CSRF state tokens. Every token is valid for one callback only.
#[derive(Clone)]
pub struct StateManager {
    states: Arc<Mutex<HashMap<String, StateData>>>,
    ttl: Duration,
}

impl StateManager {
    /// State expires after 10 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Stores the PKCE verifier for `provider` and returns the state token to send.
    pub fn generate(&self, provider: ProviderKind, pkce_verifier: String) -> String {
        let state = Self::generate_token();
        let data = StateData {
            provider,
            pkce_verifier,
            expires_at: Utc::now() + self.ttl,
        };

        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        // Abandoned logins never call back
        let now = Utc::now();
        states.retain(|_, data| data.expires_at > now);
        states.insert(state.clone(), data);

        state
    }

    /// Removes the state and returns its data when it exists, has not expired and
    /// was issued for `provider`.
    pub fn consume(&self, state: &str, provider: ProviderKind) -> Option<StateData> {
        let data = self
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(state)?;

        if Utc::now() > data.expires_at || data.provider != provider {
            return None;
        }
        Some(data)
    }

    pub fn len(&self) -> usize {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn generate_token() -> String {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        hex::encode(random_bytes)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}
