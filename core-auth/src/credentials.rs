//! Credential service contract
//!
//! The credential service owns session state and knows how to renew it. The
//! network layer only talks to this trait, so hosts can plug in their own
//! session handling in place of [`SessionCredentialService`](crate::SessionCredentialService).

use crate::error::Result;
use crate::types::TokenLifetimes;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait CredentialService: Send + Sync {
    /// Whether a usable session exists.
    async fn is_authenticated(&self) -> bool;

    /// Current access token, `None` when signed out.
    async fn access_token(&self) -> Result<Option<String>>;

    /// Whether the access token is close enough to expiry to be refreshed.
    ///
    /// Implementations that cannot tell return `true`.
    async fn needs_refresh(&self) -> bool {
        true
    }

    /// Expiry of the current access token, if known.
    async fn access_token_expires_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Exchanges the refresh token for a new token pair.
    async fn refresh(&self, lifetimes: TokenLifetimes) -> Result<()>;
}
