//! Authorization header step
//!
//! Runs after the interceptor chain, so the token it attaches is the one left
//! behind by any refresh the chain performed.

use crate::error::{NetworkError, Result};
use bridge_traits::http::HttpRequest;
use core_auth::{AuthError, CredentialService};
use std::sync::Arc;

/// Sets `Authorization: Bearer <token>` from the credential service.
#[derive(Clone)]
pub struct Authorizer {
    credentials: Arc<dyn CredentialService>,
}

impl Authorizer {
    pub fn new(credentials: Arc<dyn CredentialService>) -> Self {
        Self { credentials }
    }

    pub async fn authorize(&self, request: HttpRequest) -> Result<HttpRequest> {
        match self.credentials.access_token().await {
            Ok(Some(token)) => Ok(request.bearer_token(token)),
            Ok(None) | Err(AuthError::AuthenticationTokenNotFound) => {
                Err(NetworkError::AuthenticationTokenNotFound)
            }
            Err(e) => Err(NetworkError::interception("authorizer", e.to_string())),
        }
    }
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer").finish_non_exhaustive()
    }
}
