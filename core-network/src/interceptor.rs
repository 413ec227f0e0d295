//! Request interception pipeline
//!
//! An [`Interceptor`] validates or rewrites a request before it is sent.
//! [`InterceptorChain`] runs interceptors in insertion order, feeding each
//! one's output into the next; the first failure aborts the chain and later
//! interceptors are never invoked.

use crate::error::Result;
use async_trait::async_trait;
use bridge_traits::http::HttpRequest;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Validates or transforms `request`. Errors abort the chain.
    ///
    /// The chain returns an error to the caller exactly as the interceptor
    /// produced it, without wrapping or tagging it. Host implementations
    /// should report a rejection with [`NetworkError::interception`] so it
    /// surfaces as [`NetworkError::InterceptionFailed`] carrying the
    /// interceptor's name.
    ///
    /// [`NetworkError::interception`]: crate::error::NetworkError::interception
    /// [`NetworkError::InterceptionFailed`]: crate::error::NetworkError::InterceptionFailed
    async fn intercept(&self, request: HttpRequest) -> Result<HttpRequest>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Ordered list of interceptors.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.push(interceptor);
        self
    }

    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Runs every interceptor in order and returns the final request.
    pub async fn proceed(&self, request: HttpRequest) -> Result<HttpRequest> {
        let mut request = request;
        for interceptor in &self.interceptors {
            trace!(interceptor = interceptor.name(), "Running interceptor");
            request = match interceptor.intercept(request).await {
                Ok(next) => next,
                Err(e) => {
                    debug!(interceptor = interceptor.name(), error = %e, "Interceptor aborted request");
                    return Err(e);
                }
            };
        }
        Ok(request)
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("interceptors", &self.names())
            .finish()
    }
}
