//! Identity resolution
//!
//! Session management belongs to a third-party identity provider; this module
//! only resolves a bearer token into an `Identity` through a narrow trait and
//! rejects owner-scoped requests that resolve to nothing.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::identity::Identity;

/// Trait for resolving bearer tokens into identities
///
/// Implementations:
/// - `RemoteSessionProvider`: forwards the token to a hosted session endpoint
/// - `StaticTokenProvider`: config token map (local backend, tests)
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token. `Ok(None)` means unauthenticated.
    async fn resolve(&self, token: &str) -> Result<Option<Identity>>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Identity provider backed by a hosted session endpoint
pub struct RemoteSessionProvider {
    client: reqwest::Client,
    session_url: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    user: Option<Identity>,
}

impl RemoteSessionProvider {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let session_url = config
            .session_url
            .clone()
            .ok_or_else(|| Error::Config("hosted backend selected but auth.session_url is empty".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Ok(Self {
            client,
            session_url,
        })
    }
}

#[async_trait]
impl IdentityProvider for RemoteSessionProvider {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>> {
        let response = self
            .client
            .get(&self.session_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("session lookup failed: {}", e)))?;

        // The provider reports unknown/expired sessions as 401
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "session endpoint returned {}",
                response.status()
            )));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("failed to parse session response: {}", e)))?;
        Ok(session.user)
    }

    fn name(&self) -> &str {
        "remote-session"
    }
}

/// Identity provider backed by a static token map
pub struct StaticTokenProvider {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenProvider {
    pub fn new(tokens: HashMap<String, Identity>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>> {
        Ok(self.tokens.get(token).cloned())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Extractor that resolves the request's bearer token into an identity.
///
/// Every owner-scoped handler takes this; a missing or unresolvable token is
/// rejected before the handler body runs.
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(Error::NotAuthorized)?;

        match state.identity().resolve(token).await? {
            Some(identity) => Ok(AuthUser(identity)),
            None => Err(Error::NotAuthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_resolves_known_tokens() {
        let mut tokens = HashMap::new();
        tokens.insert("tok-1".to_string(), Identity::from_id("u1"));
        let provider = StaticTokenProvider::new(tokens);

        let identity = provider.resolve("tok-1").await.unwrap();
        assert_eq!(identity.unwrap().id, "u1");
        assert!(provider.resolve("unknown").await.unwrap().is_none());
    }
}
