use crate::request_state::RequestState;
use bridge_traits::error::BridgeError;
use core_auth::AuthError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Authentication token not found")]
    AuthenticationTokenNotFound,

    #[error("Interceptor '{interceptor}' rejected the request: {reason}")]
    InterceptionFailed { interceptor: String, reason: String },

    /// Token refresh failed; the underlying error is surfaced as-is.
    #[error(transparent)]
    RefreshFailed(#[from] AuthError),

    #[error("Invalid request state transition from {from} to {to}")]
    InvalidStateTransition {
        from: RequestState,
        to: RequestState,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request failed with status {status}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] BridgeError),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl NetworkError {
    /// Convenience constructor for host-defined interceptors.
    pub fn interception(interceptor: impl Into<String>, reason: impl Into<String>) -> Self {
        NetworkError::InterceptionFailed {
            interceptor: interceptor.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, NetworkError>;
