use chrono::{DateTime, Duration, Utc};
use core_runtime::config::{CoreConfig, DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_REFRESH_TOKEN_TTL};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifetimes requested from the server when refreshing a session.
///
/// # Examples
///
/// ```
/// use core_auth::TokenLifetimes;
/// use std::time::Duration;
///
/// let lifetimes = TokenLifetimes::default();
/// assert_eq!(lifetimes.access_token_ttl, Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access_token_ttl: std::time::Duration,
    pub refresh_token_ttl: std::time::Duration,
}

impl TokenLifetimes {
    pub fn new(access_token_ttl: std::time::Duration, refresh_token_ttl: std::time::Duration) -> Self {
        Self {
            access_token_ttl,
            refresh_token_ttl,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.access_token_ttl, config.refresh_token_ttl)
    }
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self::new(DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_REFRESH_TOKEN_TTL)
    }
}

/// Token pair of an authenticated session.
///
/// # Security
///
/// Tokens should be stored securely and never logged. The `Debug`
/// implementation redacts both token strings.
///
/// # Examples
///
/// ```
/// use core_auth::SessionTokens;
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let tokens = SessionTokens::new("access", "refresh", now + Duration::minutes(10));
///
/// assert!(!tokens.is_access_expired_with_buffer(now, Duration::minutes(5)));
/// assert!(tokens.is_access_expired_with_buffer(now, Duration::minutes(10)));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    /// `None` when the server did not report a refresh-token expiry
    #[serde(default)]
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

impl SessionTokens {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        access_expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            access_expires_at,
            refresh_expires_at: None,
        }
    }

    pub fn with_refresh_expires_at(mut self, refresh_expires_at: DateTime<Utc>) -> Self {
        self.refresh_expires_at = Some(refresh_expires_at);
        self
    }

    /// Returns `true` if the access token is expired or expires within `buffer`.
    pub fn is_access_expired_with_buffer(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        now + buffer >= self.access_expires_at
    }

    /// Returns `true` once the refresh token can no longer be exchanged.
    pub fn is_refresh_expired(&self, now: DateTime<Utc>) -> bool {
        self.refresh_expires_at
            .map_or(false, |expires_at| now >= expires_at)
    }

    /// Time left before the access token expires, `None` if already expired.
    pub fn time_until_access_expiry(&self, now: DateTime<Utc>) -> Option<Duration> {
        if now >= self.access_expires_at {
            None
        } else {
            Some(self.access_expires_at - now)
        }
    }
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish()
    }
}

/// Authentication state of the session.
///
/// ```text
/// SignedOut -> SignedIn <-> TokenRefreshing
///                 |               |
///                 +--> SignedOut <+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn,
    TokenRefreshing,
}

impl AuthState {
    /// Returns `true` for `SignedIn` and `TokenRefreshing`.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::SignedIn | AuthState::TokenRefreshing)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::SignedOut => write!(f, "Signed Out"),
            AuthState::SignedIn => write!(f, "Signed In"),
            AuthState::TokenRefreshing => write!(f, "Refreshing Token..."),
        }
    }
}
