//! API client
//!
//! [`ApiClient`] owns the transport, the interceptor chain and the optional
//! authorization step. Each call produces a [`RequestTask`] that tracks its
//! own lifecycle and can be cancelled from any clone.
//!
//! ```ignore
//! let client = ApiClient::builder(transport)
//!     .base_url("https://api.example.com/v1")
//!     .interceptor(Arc::new(AuthenticationCheckInterceptor::new(credentials.clone())))
//!     .authorizer(Authorizer::new(credentials))
//!     .build()?;
//!
//! let task = client.request(HttpRequest::get("users/me"));
//! let response = task.resume().await?;
//! ```

use crate::authorization::Authorizer;
use crate::endpoint::{decode, Endpoint};
use crate::error::{NetworkError, Result};
use crate::interceptor::{Interceptor, InterceptorChain};
use crate::request_state::{RequestLifecycle, RequestState};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use core_runtime::events::{CoreEvent, EventBus, NetworkEvent};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    transport: Arc<dyn HttpClient>,
    base_url: Option<String>,
    chain: InterceptorChain,
    authorizer: Option<Authorizer>,
    default_headers: Vec<(String, String)>,
    timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
    event_bus: Option<EventBus>,
}

impl ApiClientBuilder {
    pub fn new(transport: Arc<dyn HttpClient>) -> Self {
        Self {
            transport,
            base_url: None,
            chain: InterceptorChain::new(),
            authorizer: None,
            default_headers: Vec::new(),
            timeout: None,
            retry_policy: None,
            event_bus: None,
        }
    }

    /// Base URL that relative request paths are joined against.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Appends an interceptor; interceptors run in the order they are added.
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.chain.push(interceptor);
        self
    }

    pub fn interceptors(mut self, chain: InterceptorChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn authorizer(mut self, authorizer: Authorizer) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Header added to every request that does not set it.
    pub fn default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((key.into(), value.into()));
        self
    }

    /// Timeout applied to requests that do not set their own.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Retry policy handed to the transport. Without one the transport's
    /// own default applies.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let base_url = self.base_url.map(|raw| parse_base_url(&raw)).transpose()?;

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                base_url,
                chain: self.chain,
                authorizer: self.authorizer,
                default_headers: self.default_headers,
                timeout: self.timeout,
                retry_policy: self.retry_policy,
                event_bus: self.event_bus,
            }),
        })
    }
}

/// Parses a base URL and makes sure its path ends in `/` so that joins
/// append to it instead of replacing the last segment.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).map_err(|e| NetworkError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() {
        return Err(NetworkError::InvalidUrl {
            url: raw.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        });
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

struct ClientInner {
    transport: Arc<dyn HttpClient>,
    base_url: Option<Url>,
    chain: InterceptorChain,
    authorizer: Option<Authorizer>,
    default_headers: Vec<(String, String)>,
    timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
    event_bus: Option<EventBus>,
}

impl ClientInner {
    fn resolve_url(&self, raw: &str) -> Result<Url> {
        match Url::parse(raw) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_ref().ok_or_else(|| NetworkError::InvalidUrl {
                    url: raw.to_string(),
                    reason: "relative URL without a base URL".to_string(),
                })?;
                base.join(raw.trim_start_matches('/'))
                    .map_err(|e| NetworkError::InvalidUrl {
                        url: raw.to_string(),
                        reason: e.to_string(),
                    })
            }
            Err(e) => Err(NetworkError::InvalidUrl {
                url: raw.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Resolves the URL and applies client defaults.
    fn prepare(&self, request: HttpRequest) -> Result<HttpRequest> {
        let mut request = request;
        request.url = self.resolve_url(&request.url)?.to_string();

        for (key, value) in &self.default_headers {
            if request.header_value(key).is_none() {
                request = request.header(key.clone(), value.clone());
            }
        }

        if request.timeout.is_none() {
            if let Some(timeout) = self.timeout {
                request = request.timeout(timeout);
            }
        }

        Ok(request)
    }

    /// Interceptor chain, then authorization, then the transport.
    async fn run(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request = self.chain.proceed(request).await?;

        let request = match &self.authorizer {
            Some(authorizer) => authorizer.authorize(request).await?,
            None => request,
        };

        let response = match &self.retry_policy {
            Some(policy) => {
                self.transport
                    .execute_with_retry(request, policy.clone())
                    .await?
            }
            None => self.transport.execute(request).await?,
        };

        if !response.is_success() {
            return Err(NetworkError::Status {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        Ok(response)
    }

    fn emit(&self, event: NetworkEvent) {
        if let Some(event_bus) = &self.event_bus {
            let _ = event_bus.emit(CoreEvent::Network(event));
        }
    }
}

/// HTTP client that runs requests through interceptors and authorization.
///
/// Cloning is cheap; clones share configuration.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    pub fn builder(transport: Arc<dyn HttpClient>) -> ApiClientBuilder {
        ApiClientBuilder::new(transport)
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.inner.base_url.as_ref()
    }

    pub fn interceptors(&self) -> &InterceptorChain {
        &self.inner.chain
    }

    /// Creates a task for `request` without starting it.
    pub fn request(&self, request: HttpRequest) -> RequestTask {
        RequestTask {
            id: Uuid::new_v4(),
            client: self.clone(),
            request,
            lifecycle: Arc::new(Mutex::new(RequestLifecycle::new())),
            cancel: CancellationToken::new(),
        }
    }

    /// Creates and immediately resumes a task for `request`.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.request(request).resume().await
    }

    /// Executes a typed endpoint and decodes its JSON response.
    pub async fn send<E: Endpoint>(&self, endpoint: &E) -> Result<E::Response> {
        let request = endpoint.to_request()?;
        let response = self.execute(request).await?;
        decode(&response.body)
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_ref().map(Url::as_str))
            .field("interceptors", &self.inner.chain)
            .field("authorized", &self.inner.authorizer.is_some())
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

/// A single request with its own lifecycle.
///
/// A task is resumed at most once. Clones share the lifecycle and the
/// cancellation handle, so one clone can cancel a request another clone is
/// awaiting.
#[derive(Clone)]
pub struct RequestTask {
    id: Uuid,
    client: ApiClient,
    request: HttpRequest,
    lifecycle: Arc<Mutex<RequestLifecycle>>,
    cancel: CancellationToken,
}

impl RequestTask {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> RequestState {
        self.lifecycle().state()
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Starts the request and waits for its response.
    ///
    /// Fails with `InvalidStateTransition` when the task was already resumed
    /// or cancelled, and with `Cancelled` when [`cancel`](Self::cancel) is
    /// called while the request is in flight.
    pub async fn resume(&self) -> Result<HttpResponse> {
        self.lifecycle().transition(RequestState::Resumed)?;

        let inner = &self.client.inner;
        let request = match inner.prepare(self.request.clone()) {
            Ok(request) => request,
            Err(e) => {
                self.finish();
                inner.emit(NetworkEvent::RequestFailed {
                    url: self.request.url.clone(),
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let url = request.url.clone();
        debug!(request_id = %self.id, method = request.method.as_str(), url = %url, "Request started");
        inner.emit(NetworkEvent::RequestStarted { url: url.clone() });

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(NetworkError::Cancelled),
            result = inner.run(request) => result,
        };

        if self.cancel.is_cancelled() || !self.finish() {
            info!(request_id = %self.id, url = %url, "Request cancelled");
            return Err(NetworkError::Cancelled);
        }

        match &outcome {
            Ok(response) => {
                debug!(request_id = %self.id, url = %url, status = response.status, "Request finished");
                inner.emit(NetworkEvent::RequestFinished {
                    url,
                    status: response.status,
                });
            }
            Err(e) => {
                warn!(request_id = %self.id, url = %url, error = %e, "Request failed");
                inner.emit(NetworkEvent::RequestFailed {
                    url,
                    message: e.to_string(),
                });
            }
        }

        outcome
    }

    /// Cancels the request. An in-flight `resume` returns `Cancelled`; a
    /// refresh it was waiting on keeps running for other callers.
    pub fn cancel(&self) -> Result<()> {
        self.lifecycle().transition(RequestState::Cancelled)?;
        self.cancel.cancel();
        self.client.inner.emit(NetworkEvent::RequestCancelled {
            url: self.request.url.clone(),
        });
        Ok(())
    }

    /// Moves to `Finished`; false when the task was cancelled first.
    fn finish(&self) -> bool {
        self.lifecycle().transition(RequestState::Finished).is_ok()
    }

    fn lifecycle(&self) -> MutexGuard<'_, RequestLifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for RequestTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTask")
            .field("id", &self.id)
            .field("method", &self.request.method)
            .field("url", &self.request.url)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::BridgeError;

    struct StaticTransport(u16);

    #[async_trait]
    impl HttpClient for StaticTransport {
        async fn execute(
            &self,
            request: HttpRequest,
        ) -> bridge_traits::error::Result<HttpResponse> {
            request.resolved_url()?;
            if self.0 == 0 {
                return Err(BridgeError::OperationFailed("connection refused".into()));
            }
            Ok(HttpResponse::new(self.0, request.url.into_bytes()))
        }
    }

    fn client(status: u16) -> ApiClient {
        ApiClient::builder(Arc::new(StaticTransport(status)))
            .base_url("https://api.example.com/v1")
            .build()
            .unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        assert_eq!(
            parse_base_url("https://api.example.com/v1").unwrap().as_str(),
            "https://api.example.com/v1/"
        );
        assert!(matches!(
            parse_base_url("not a url"),
            Err(NetworkError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_base_url("mailto:someone@example.com"),
            Err(NetworkError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_resolve_url() {
        let client = client(200);
        let inner = &client.inner;

        assert_eq!(
            inner.resolve_url("users/me").unwrap().as_str(),
            "https://api.example.com/v1/users/me"
        );
        assert_eq!(
            inner.resolve_url("/users/me").unwrap().as_str(),
            "https://api.example.com/v1/users/me"
        );
        assert_eq!(
            inner.resolve_url("https://other.example.com/x").unwrap().as_str(),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_relative_url_without_base_fails() {
        let client = ApiClient::builder(Arc::new(StaticTransport(200)))
            .build()
            .unwrap();

        assert!(matches!(
            client.inner.resolve_url("users/me"),
            Err(NetworkError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_prepare_applies_defaults_without_overriding() {
        let client = ApiClient::builder(Arc::new(StaticTransport(200)))
            .base_url("https://api.example.com")
            .default_header("Accept", "application/json")
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        let prepared = client
            .inner
            .prepare(HttpRequest::get("items").header("accept", "text/csv"))
            .unwrap();
        assert_eq!(prepared.url, "https://api.example.com/items");
        assert_eq!(prepared.header_value("Accept"), Some("text/csv"));
        assert_eq!(prepared.timeout, Some(Duration::from_secs(10)));

        let prepared = client
            .inner
            .prepare(HttpRequest::get("items").timeout(Duration::from_secs(2)))
            .unwrap();
        assert_eq!(prepared.header_value("Accept"), Some("application/json"));
        assert_eq!(prepared.timeout, Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_resume_finishes() {
        let task = client(200).request(HttpRequest::get("ping"));
        assert_eq!(task.state(), RequestState::Initialized);

        let response = task.resume().await.unwrap();

        assert_eq!(response.text().unwrap(), "https://api.example.com/v1/ping");
        assert_eq!(task.state(), RequestState::Finished);
    }

    #[tokio::test]
    async fn test_status_and_transport_errors_finish_the_task() {
        let task = client(503).request(HttpRequest::get("ping"));
        let err = task.resume().await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(task.state(), RequestState::Finished);

        let task = client(0).request(HttpRequest::get("ping"));
        assert!(matches!(
            task.resume().await,
            Err(NetworkError::Transport(BridgeError::OperationFailed(_)))
        ));
        assert_eq!(task.state(), RequestState::Finished);
    }

    #[tokio::test]
    async fn test_second_resume_is_rejected() {
        let task = client(200).request(HttpRequest::get("ping"));
        task.resume().await.unwrap();

        assert!(matches!(
            task.resume().await,
            Err(NetworkError::InvalidStateTransition {
                from: RequestState::Finished,
                to: RequestState::Resumed,
            })
        ));
    }

    #[tokio::test]
    async fn test_cancel_before_resume() {
        let task = client(200).request(HttpRequest::get("ping"));
        task.cancel().unwrap();

        assert_eq!(task.state(), RequestState::Cancelled);
        assert!(matches!(
            task.resume().await,
            Err(NetworkError::InvalidStateTransition {
                from: RequestState::Cancelled,
                to: RequestState::Resumed,
            })
        ));
        assert!(task.cancel().is_err());
    }
}
