//! Secure Token Storage
//!
//! Persists the session token pair through the host's [`SecureStore`]
//! (Keychain, Keystore, ...).
//!
//! ## Security Features
//!
//! - Tokens are never logged or exposed in error messages
//! - Corrupted entries are erased instead of being returned
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{SessionTokens, TokenStore};
//! use chrono::{Duration, Utc};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let token_store = TokenStore::new(secure_store);
//!
//! let tokens = SessionTokens::new("access", "refresh", Utc::now() + Duration::hours(1));
//! token_store.store(&tokens).await?;
//!
//! let restored = token_store.load().await?;
//! token_store.clear().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::SessionTokens;
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Key the session is stored under.
pub const SESSION_TOKENS_KEY: &str = "session.tokens";

/// Secure storage for the session token pair.
///
/// Tokens are serialized to JSON before storage; all operations go through
/// the `SecureStore` trait.
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
    key: String,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        Self::with_key(secure_store, SESSION_TOKENS_KEY)
    }

    /// Uses a custom storage key, e.g. to keep several sessions apart.
    pub fn with_key(secure_store: Arc<dyn SecureStore>, key: impl Into<String>) -> Self {
        Self {
            secure_store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stores the token pair, overwriting any previous session.
    pub async fn store(&self, tokens: &SessionTokens) -> Result<()> {
        let json = serde_json::to_vec(tokens).map_err(|e| {
            warn!(error = %e, "Failed to serialize session tokens");
            AuthError::SerializationFailed(e.to_string())
        })?;

        self.secure_store
            .set_secret(&self.key, &json)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to store session tokens");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!(
            access_expires_at = %tokens.access_expires_at,
            "Session tokens stored securely"
        );
        Ok(())
    }

    /// Loads the stored token pair.
    ///
    /// Returns `Ok(None)` when nothing is stored. Entries that fail to
    /// deserialize are deleted and reported as `SerializationFailed`.
    pub async fn load(&self) -> Result<Option<SessionTokens>> {
        let data = self.secure_store.get_secret(&self.key).await.map_err(|e| {
            warn!(error = %e, "Failed to read session tokens");
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        let Some(data) = data else {
            debug!("No session tokens in storage");
            return Ok(None);
        };

        match serde_json::from_slice::<SessionTokens>(&data) {
            Ok(tokens) => {
                debug!(
                    access_expires_at = %tokens.access_expires_at,
                    "Session tokens loaded"
                );
                Ok(Some(tokens))
            }
            Err(e) => {
                warn!(error = %e, "Stored session tokens are corrupted, erasing");
                if let Err(delete_err) = self.secure_store.delete_secret(&self.key).await {
                    warn!(error = %delete_err, "Failed to erase corrupted session tokens");
                }
                Err(AuthError::SerializationFailed(e.to_string()))
            }
        }
    }

    /// Erases the stored session. Succeeds when nothing is stored.
    pub async fn clear(&self) -> Result<()> {
        self.secure_store
            .delete_secret(&self.key)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to erase session tokens");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!("Session tokens erased");
        Ok(())
    }

    pub async fn exists(&self) -> Result<bool> {
        self.secure_store
            .has_secret(&self.key)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))
    }
}
