use thiserror::Error;

/// Authentication failures.
///
/// `Clone` so a single refresh outcome can be delivered to every caller
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication token not found")]
    AuthenticationTokenNotFound,

    #[error("Session expired, sign in again")]
    SessionExpired,

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether retrying later may succeed without a new sign-in.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AuthError::TokenRefreshFailed(_)
                | AuthError::SecureStorageUnavailable(_)
                | AuthError::Internal(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
