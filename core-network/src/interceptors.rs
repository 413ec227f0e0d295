//! Built-in interceptors

use crate::error::{NetworkError, Result};
use crate::interceptor::Interceptor;
use async_trait::async_trait;
use bridge_traits::http::HttpRequest;
use core_auth::{CredentialService, RefreshCoordinator};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Fails fast when there is no usable session. Never triggers a refresh.
pub struct AuthenticationCheckInterceptor {
    credentials: Arc<dyn CredentialService>,
}

impl AuthenticationCheckInterceptor {
    pub fn new(credentials: Arc<dyn CredentialService>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl Interceptor for AuthenticationCheckInterceptor {
    async fn intercept(&self, request: HttpRequest) -> Result<HttpRequest> {
        if !self.credentials.is_authenticated().await {
            debug!(url = %request.url, "Rejecting request without session");
            return Err(NetworkError::AuthenticationTokenNotFound);
        }
        Ok(request)
    }

    fn name(&self) -> &str {
        "authentication-check"
    }
}

/// When [`TokenRefreshInterceptor`] refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Refresh before every request.
    #[default]
    Always,
    /// Refresh only when the credential service reports the access token as
    /// expiring.
    WhenExpiring,
}

/// Refreshes the session through the shared [`RefreshCoordinator`] and passes
/// the request on unchanged.
///
/// Concurrent requests share one refresh; a refresh failure fails every
/// request that waited on it.
pub struct TokenRefreshInterceptor {
    coordinator: Arc<RefreshCoordinator>,
    policy: RefreshPolicy,
}

impl TokenRefreshInterceptor {
    pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
        Self {
            coordinator,
            policy: RefreshPolicy::Always,
        }
    }

    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn only_when_expiring(self) -> Self {
        self.with_policy(RefreshPolicy::WhenExpiring)
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }
}

#[async_trait]
impl Interceptor for TokenRefreshInterceptor {
    async fn intercept(&self, request: HttpRequest) -> Result<HttpRequest> {
        if self.policy == RefreshPolicy::WhenExpiring
            && !self.coordinator.credentials().needs_refresh().await
        {
            return Ok(request);
        }

        self.coordinator.refresh().await?;
        Ok(request)
    }

    fn name(&self) -> &str {
        "token-refresh"
    }
}

/// Adds fixed headers to requests that do not already carry them.
#[derive(Debug, Clone, Default)]
pub struct HeaderInterceptor {
    headers: Vec<(String, String)>,
}

impl HeaderInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn user_agent(value: impl Into<String>) -> Self {
        Self::new().header("User-Agent", value)
    }
}

#[async_trait]
impl Interceptor for HeaderInterceptor {
    async fn intercept(&self, request: HttpRequest) -> Result<HttpRequest> {
        let mut request = request;
        for (key, value) in &self.headers {
            if request.header_value(key).is_none() {
                request = request.header(key.clone(), value.clone());
            }
        }
        Ok(request)
    }

    fn name(&self) -> &str {
        "headers"
    }
}

type InterceptFn = dyn Fn(HttpRequest) -> BoxFuture<'static, Result<HttpRequest>> + Send + Sync;

/// Interceptor backed by an async closure.
///
/// ```ignore
/// let require_json = FnInterceptor::new("require-json", |request| async move {
///     match request.header_value("Accept") {
///         Some("application/json") => Ok(request),
///         _ => Err(NetworkError::interception("require-json", "missing Accept header")),
///     }
/// });
/// ```
pub struct FnInterceptor {
    name: String,
    intercept: Box<InterceptFn>,
}

impl FnInterceptor {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpRequest>> + Send + 'static,
    {
        Self {
            name: name.into(),
            intercept: Box::new(move |request| f(request).boxed()),
        }
    }
}

#[async_trait]
impl Interceptor for FnInterceptor {
    async fn intercept(&self, request: HttpRequest) -> Result<HttpRequest> {
        (self.intercept)(request).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
