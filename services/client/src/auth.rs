//! services/client/src/auth.rs
//!
//! Access/refresh token handling for the backend. The chat bus and every
//! REST call share the same credential slot: a 401 anywhere triggers one
//! refresh attempt, and a failed refresh clears the slot so the caller
//! can route the user back to authentication.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::ports::{PortError, PortResult};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// The credential pair issued by the backend login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// A shared, process-wide credential slot. Cloning shares the slot.
#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<TokenPair>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, pair: TokenPair) {
        *self.inner.write().await = Some(pair);
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|pair| pair.access_token.clone())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|pair| pair.refresh_token.clone())
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

impl TokenResponse {
    fn to_pair(self) -> TokenPair {
        TokenPair {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
        }
    }
}

/// Talks to the backend auth endpoints and keeps the [`TokenStore`]
/// current.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl AuthClient {
    pub fn new(http: reqwest::Client, base_url: String, tokens: TokenStore) -> Self {
        Self {
            http,
            base_url,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Credential login. On success the token pair is stored.
    pub async fn login(&self, email: &str, password: &str) -> PortResult<()> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(PortError::Unauthorized);
        }
        let body: TokenResponse = response
            .error_for_status()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        self.tokens.set(body.to_pair()).await;
        info!("Logged in as {email}");
        Ok(())
    }

    /// Exchanges the refresh token for a new pair. A failed exchange
    /// clears all local credentials; the user has to re-authenticate.
    pub async fn refresh(&self) -> PortResult<()> {
        let Some(refresh_token) = self.tokens.refresh_token().await else {
            return Err(PortError::Unauthorized);
        };

        let result = async {
            let response = self
                .http
                .post(format!("{}/auth/refresh", self.base_url))
                .json(&RefreshRequest {
                    refresh_token: &refresh_token,
                })
                .send()
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            if !response.status().is_success() {
                return Err(PortError::Unauthorized);
            }
            response
                .json::<TokenResponse>()
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))
        }
        .await;

        match result {
            Ok(body) => {
                self.tokens.set(body.to_pair()).await;
                Ok(())
            }
            Err(e) => {
                warn!("Token refresh failed, clearing credentials: {e}");
                self.tokens.clear().await;
                Err(PortError::Unauthorized)
            }
        }
    }
}
