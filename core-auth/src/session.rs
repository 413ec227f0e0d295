//! Session-backed credential service
//!
//! Keeps the signed-in token pair in a [`TokenStore`], answers token queries
//! from an in-memory copy, and renews the pair by POSTing the refresh token to
//! the server's refresh endpoint.
//!
//! ## Refresh exchange
//!
//! ```text
//! POST <refresh_url>
//! { "refresh_token": "...", "access_token_ttl": 3600, "refresh_token_ttl": 2592000 }
//!
//! 200 OK
//! { "access_token": "...", "refresh_token": "...", "expires_in": 3600, "refresh_expires_in": 2592000 }
//! ```
//!
//! `refresh_token` and `refresh_expires_in` are optional in the response; when
//! the server does not rotate the refresh token the previous one is kept.
//! A 401 or 403 means the refresh token was rejected and the session is
//! cleared.

use crate::credentials::CredentialService;
use crate::error::{AuthError, Result};
use crate::token_store::TokenStore;
use crate::types::{AuthState, SessionTokens, TokenLifetimes};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use bridge_traits::storage::SecureStore;
use bridge_traits::time::Clock;
use chrono::{DateTime, Duration, Utc};
use core_runtime::config::{CoreConfig, DEFAULT_REFRESH_BUFFER};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
    access_token_ttl: u64,
    refresh_token_ttl: u64,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
    #[serde(default)]
    refresh_expires_in: Option<i64>,
}

/// Credential service backed by a stored session and an HTTP refresh endpoint.
pub struct SessionCredentialService {
    http_client: Arc<dyn HttpClient>,
    token_store: TokenStore,
    refresh_url: Url,
    clock: Arc<dyn Clock>,
    refresh_buffer: Duration,
    session: RwLock<Option<SessionTokens>>,
    state: RwLock<AuthState>,
    event_bus: Option<EventBus>,
}

impl SessionCredentialService {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        secure_store: Arc<dyn SecureStore>,
        refresh_url: Url,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http_client,
            token_store: TokenStore::new(secure_store),
            refresh_url,
            clock,
            refresh_buffer: to_chrono(DEFAULT_REFRESH_BUFFER),
            session: RwLock::new(None),
            state: RwLock::new(AuthState::SignedOut),
            event_bus: None,
        }
    }

    /// Builds the service from the core configuration's bridges and settings.
    pub fn from_config(config: &CoreConfig) -> Result<Self> {
        let refresh_url = config
            .refresh_url()
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(Self::new(
            Arc::clone(&config.http_client),
            Arc::clone(&config.secure_store),
            refresh_url,
            Arc::clone(&config.clock),
        )
        .with_refresh_buffer(config.refresh_buffer))
    }

    /// How long before access-token expiry `needs_refresh` reports `true`.
    pub fn with_refresh_buffer(mut self, buffer: std::time::Duration) -> Self {
        self.refresh_buffer = to_chrono(buffer);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }

    pub async fn state(&self) -> AuthState {
        *self.state.read().await
    }

    /// Stores a freshly issued token pair and marks the session signed in.
    #[instrument(skip(self, tokens))]
    pub async fn sign_in(&self, tokens: SessionTokens) -> Result<()> {
        self.token_store.store(&tokens).await?;
        *self.session.write().await = Some(tokens);
        *self.state.write().await = AuthState::SignedIn;

        info!("Session signed in");
        self.emit(AuthEvent::SignedIn);
        Ok(())
    }

    /// Erases the session from memory and secure storage.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        *self.session.write().await = None;
        *self.state.write().await = AuthState::SignedOut;
        self.token_store.clear().await?;

        info!("Session signed out");
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    /// Current token pair, restoring it from secure storage on first use.
    pub async fn session(&self) -> Result<Option<SessionTokens>> {
        if let Some(tokens) = self.session.read().await.as_ref() {
            return Ok(Some(tokens.clone()));
        }

        let mut session = self.session.write().await;
        if session.is_none() {
            if let Some(tokens) = self.token_store.load().await? {
                debug!("Restored session from secure storage");
                *session = Some(tokens);
                *self.state.write().await = AuthState::SignedIn;
            }
        }
        Ok(session.clone())
    }

    async fn set_state(&self, state: AuthState) {
        *self.state.write().await = state;
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(event_bus) = &self.event_bus {
            let _ = event_bus.emit(CoreEvent::Auth(event));
        }
    }

    async fn expire_session(&self) {
        *self.session.write().await = None;
        self.set_state(AuthState::SignedOut).await;
        if let Err(e) = self.token_store.clear().await {
            warn!(error = %e, "Failed to erase rejected session");
        }
        self.emit(AuthEvent::SignedOut);
    }

    async fn exchange(
        &self,
        current: &SessionTokens,
        lifetimes: TokenLifetimes,
    ) -> Result<SessionTokens> {
        let body = RefreshRequest {
            refresh_token: &current.refresh_token,
            access_token_ttl: lifetimes.access_token_ttl.as_secs(),
            refresh_token_ttl: lifetimes.refresh_token_ttl.as_secs(),
        };

        let request = HttpRequest::post(self.refresh_url.as_str())
            .header("Accept", "application/json")
            .json(&body)
            .map_err(|e| AuthError::SerializationFailed(e.to_string()))?;

        // Sent once; the refresh token may be single-use.
        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::none())
            .await
            .map_err(|e| AuthError::TokenRefreshFailed(e.to_string()))?;

        if response.status == 401 || response.status == 403 {
            warn!(status = response.status, "Refresh token rejected");
            self.expire_session().await;
            return Err(AuthError::SessionExpired);
        }

        if !response.is_success() {
            return Err(AuthError::TokenRefreshFailed(format!(
                "refresh endpoint returned status {}",
                response.status
            )));
        }

        let payload: RefreshResponse = response.json().map_err(|e| {
            AuthError::TokenRefreshFailed(format!("invalid refresh response: {}", e))
        })?;

        let now = self.clock.now();
        let mut tokens = SessionTokens::new(
            payload.access_token,
            payload
                .refresh_token
                .unwrap_or_else(|| current.refresh_token.clone()),
            expiry_after(now, payload.expires_in, "expires_in")?,
        );
        tokens.refresh_expires_at = match payload.refresh_expires_in {
            Some(seconds) => Some(expiry_after(now, seconds, "refresh_expires_in")?),
            None => current.refresh_expires_at,
        };

        Ok(tokens)
    }
}

#[async_trait]
impl CredentialService for SessionCredentialService {
    async fn is_authenticated(&self) -> bool {
        match self.session().await {
            Ok(Some(tokens)) => !tokens.is_refresh_expired(self.clock.now()),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Unable to read session");
                false
            }
        }
    }

    async fn access_token(&self) -> Result<Option<String>> {
        Ok(self.session().await?.map(|tokens| tokens.access_token))
    }

    async fn needs_refresh(&self) -> bool {
        match self.session().await {
            Ok(Some(tokens)) => {
                tokens.is_access_expired_with_buffer(self.clock.now(), self.refresh_buffer)
            }
            _ => true,
        }
    }

    async fn access_token_expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.session()
            .await
            .ok()
            .flatten()
            .map(|tokens| tokens.access_expires_at)
    }

    #[instrument(skip(self))]
    async fn refresh(&self, lifetimes: TokenLifetimes) -> Result<()> {
        let current = self
            .session()
            .await?
            .ok_or(AuthError::AuthenticationTokenNotFound)?;

        if current.is_refresh_expired(self.clock.now()) {
            warn!("Refresh token expired locally");
            self.expire_session().await;
            return Err(AuthError::SessionExpired);
        }

        self.set_state(AuthState::TokenRefreshing).await;

        match self.exchange(&current, lifetimes).await {
            Ok(tokens) => {
                let expires_at = tokens.access_expires_at;
                // Kept in memory even when persisting fails.
                *self.session.write().await = Some(tokens.clone());
                self.set_state(AuthState::SignedIn).await;

                if let Err(e) = self.token_store.store(&tokens).await {
                    warn!(error = %e, "Refreshed session could not be persisted");
                    return Err(e);
                }

                info!(access_expires_at = %expires_at, "Session refreshed");
                Ok(())
            }
            Err(AuthError::SessionExpired) => Err(AuthError::SessionExpired),
            Err(e) => {
                self.set_state(AuthState::SignedIn).await;
                warn!(error = %e, "Session refresh failed");
                Err(e)
            }
        }
    }
}

/// `now + seconds`, rejecting lifetimes chrono cannot represent.
fn expiry_after(now: DateTime<Utc>, seconds: i64, field: &str) -> Result<DateTime<Utc>> {
    Duration::try_seconds(seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            AuthError::TokenRefreshFailed(format!(
                "invalid refresh response: {} out of range ({})",
                field, seconds
            ))
        })
}

fn to_chrono(duration: std::time::Duration) -> Duration {
    Duration::from_std(duration).unwrap_or(Duration::MAX)
}
