//! # Core Configuration Module
//!
//! Provides configuration management for the foundation core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all bridge dependencies and settings. It enforces
//! fail-fast validation so a misconfigured client never reaches the network.
//!
//! ## Required Settings
//!
//! - `base_url` - Absolute http(s) URL that relative request paths resolve against
//!
//! ## Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP transport (desktop default: reqwest)
//! - `SecureStore` - Session token persistence (desktop default: in-memory)
//! - `Clock` - Time source (default: system clock)
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults for
//! `HttpClient` and `SecureStore` are injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .base_url("https://api.example.com")
//!     .access_token_ttl(Duration::from_secs(15 * 60))
//!     .http_client(Arc::new(MyHttpClient))
//!     .secure_store(Arc::new(MySecureStore))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, SecureStore, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default lifetime requested for access tokens (1 hour)
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Default lifetime requested for refresh tokens (30 days)
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Buffer before access-token expiry at which a refresh is considered due (5 minutes)
pub const DEFAULT_REFRESH_BUFFER: Duration = Duration::from_secs(300);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

pub const DEFAULT_USER_AGENT: &str = concat!("foundation-core/", env!("CARGO_PKG_VERSION"));

const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Core configuration.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Base URL relative request paths are resolved against
    pub base_url: Url,

    /// Path (relative to `base_url`) of the token refresh endpoint
    pub refresh_path: String,

    /// Lifetime requested for new access tokens
    pub access_token_ttl: Duration,

    /// Lifetime requested for new refresh tokens
    pub refresh_token_ttl: Duration,

    /// How long before access-token expiry a refresh becomes due
    pub refresh_buffer: Duration,

    /// Per-request timeout applied by the API client
    pub request_timeout: Duration,

    /// User agent sent with every request
    pub user_agent: String,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    /// HTTP transport
    pub http_client: Arc<dyn HttpClient>,

    /// Secure credential storage
    pub secure_store: Arc<dyn SecureStore>,

    /// Time source for expiry checks
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("base_url", &self.base_url.as_str())
            .field("refresh_path", &self.refresh_path)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("refresh_buffer", &self.refresh_buffer)
            .field("request_timeout", &self.request_timeout)
            .field("user_agent", &self.user_agent)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Absolute URL of the token refresh endpoint.
    pub fn refresh_url(&self) -> Result<Url> {
        self.base_url.join(&self.refresh_path).map_err(|e| {
            Error::Config(format!(
                "Refresh path '{}' cannot be joined to base URL: {}",
                self.refresh_path, e
            ))
        })
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Base URL uses http or https
    /// - Token lifetimes are non-zero and access ≤ refresh
    /// - Refresh buffer is shorter than the access-token lifetime
    /// - Request timeout is between 1 second and 10 minutes
    /// - Event buffer is non-zero
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Base URL must use http or https, got '{}'",
                self.base_url.scheme()
            )));
        }

        if self.base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Base URL '{}' cannot be used as a base",
                self.base_url
            )));
        }

        self.refresh_url()?;

        if self.access_token_ttl.is_zero() || self.refresh_token_ttl.is_zero() {
            return Err(Error::Config(
                "Token lifetimes must be greater than zero".to_string(),
            ));
        }

        if self.access_token_ttl > self.refresh_token_ttl {
            return Err(Error::Config(
                "Access token lifetime cannot exceed refresh token lifetime".to_string(),
            ));
        }

        if self.refresh_buffer >= self.access_token_ttl {
            return Err(Error::Config(
                "Refresh buffer must be shorter than the access token lifetime".to_string(),
            ));
        }

        if self.request_timeout < MIN_REQUEST_TIMEOUT || self.request_timeout > MAX_REQUEST_TIMEOUT
        {
            return Err(Error::Config(
                "Request timeout must be between 1 second and 10 minutes".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Mobile/Web: inject the platform-native transport."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn secure_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "SecureStore implementation is required for session persistence. \
                 Desktop: enable the 'desktop-shims' feature to use the default MemorySecureStore. \
                 Mobile: inject platform-native secure storage (Keychain/Keystore)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(
    timeout: Duration,
    user_agent: &str,
) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_config(timeout, user_agent)
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(
    _timeout: Duration,
    _user_agent: &str,
) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::MemorySecureStore;

    let store: Arc<dyn SecureStore> = Arc::new(MemorySecureStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(secure_store_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    base_url: Option<String>,
    refresh_path: Option<String>,
    access_token_ttl: Option<Duration>,
    refresh_token_ttl: Option<Duration>,
    refresh_buffer: Option<Duration>,
    request_timeout: Option<Duration>,
    user_agent: Option<String>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Sets the base URL (required).
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .base_url("https://api.example.com");
    /// ```
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the refresh endpoint path.
    ///
    /// Default: `/auth/refresh`
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = Some(path.into());
        self
    }

    /// Sets the lifetime requested for new access tokens.
    ///
    /// Default: 1 hour
    pub fn access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = Some(ttl);
        self
    }

    /// Sets the lifetime requested for new refresh tokens.
    ///
    /// Default: 30 days
    pub fn refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = Some(ttl);
        self
    }

    /// Sets how long before access-token expiry a refresh becomes due.
    ///
    /// Default: 5 minutes
    pub fn refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = Some(buffer);
        self
    }

    /// Sets the per-request timeout.
    ///
    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the HTTP transport.
    ///
    /// If not provided, the desktop default (reqwest-based) is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the secure store implementation.
    ///
    /// If not provided, the in-memory desktop store is used when the
    /// `desktop-shims` feature is enabled.
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Sets the time source. Default: [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the base URL is missing or malformed, or a value
    ///   fails validation
    /// - `Error::CapabilityMissing` if a bridge is missing and no platform
    ///   default is available
    pub fn build(self) -> Result<CoreConfig> {
        let raw_base_url = self.base_url.ok_or_else(|| {
            Error::Config("Base URL is required. Use .base_url() to set it.".to_string())
        })?;

        let base_url = Url::parse(&raw_base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", raw_base_url, e)))?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout, &user_agent)?,
        };

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let config = CoreConfig {
            base_url,
            refresh_path: self
                .refresh_path
                .unwrap_or_else(|| DEFAULT_REFRESH_PATH.to_string()),
            access_token_ttl: self.access_token_ttl.unwrap_or(DEFAULT_ACCESS_TOKEN_TTL),
            refresh_token_ttl: self.refresh_token_ttl.unwrap_or(DEFAULT_REFRESH_TOKEN_TTL),
            refresh_buffer: self.refresh_buffer.unwrap_or(DEFAULT_REFRESH_BUFFER),
            request_timeout,
            user_agent,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            secure_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HttpRequest, HttpResponse};

    struct MockHttpClient;

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Ok(HttpResponse::new(204, ""))
        }
    }

    struct MockSecureStore;

    #[async_trait]
    impl SecureStore for MockSecureStore {
        async fn set_secret(&self, _key: &str, _value: &[u8]) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_secret(&self, _key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn delete_secret(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn builder_with_bridges() -> CoreConfigBuilder {
        CoreConfig::builder()
            .http_client(Arc::new(MockHttpClient))
            .secure_store(Arc::new(MockSecureStore))
    }

    #[test]
    fn test_build_with_defaults() {
        let config = builder_with_bridges()
            .base_url("https://api.example.com/v1/")
            .build()
            .unwrap();

        assert_eq!(config.access_token_ttl, DEFAULT_ACCESS_TOKEN_TTL);
        assert_eq!(config.refresh_token_ttl, DEFAULT_REFRESH_TOKEN_TTL);
        assert_eq!(config.refresh_buffer, DEFAULT_REFRESH_BUFFER);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.event_buffer_size, 100);
        assert_eq!(
            config.refresh_url().unwrap().as_str(),
            "https://api.example.com/auth/refresh"
        );
    }

    #[test]
    fn test_relative_refresh_path_joins_base() {
        let config = builder_with_bridges()
            .base_url("https://api.example.com/v1/")
            .refresh_path("session/refresh")
            .build()
            .unwrap();

        assert_eq!(
            config.refresh_url().unwrap().as_str(),
            "https://api.example.com/v1/session/refresh"
        );
    }

    #[test]
    fn test_builder_requires_base_url() {
        let result = builder_with_bridges().build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Base URL is required")));
    }

    #[test]
    fn test_builder_rejects_malformed_base_url() {
        let result = builder_with_bridges().base_url("not a url").build();
        assert!(matches!(result, Err(Error::Config(_))));

        let result = builder_with_bridges().base_url("ftp://files.example.com").build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("http or https")));
    }

    #[test]
    fn test_token_lifetime_validation() {
        let result = builder_with_bridges()
            .base_url("https://api.example.com")
            .access_token_ttl(Duration::ZERO)
            .build();
        assert!(result.is_err());

        let result = builder_with_bridges()
            .base_url("https://api.example.com")
            .access_token_ttl(Duration::from_secs(7200))
            .refresh_token_ttl(Duration::from_secs(3600))
            .build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("cannot exceed")));

        let result = builder_with_bridges()
            .base_url("https://api.example.com")
            .access_token_ttl(Duration::from_secs(60))
            .refresh_buffer(Duration::from_secs(60))
            .build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Refresh buffer")));
    }

    #[test]
    fn test_request_timeout_bounds() {
        let too_short = builder_with_bridges()
            .base_url("https://api.example.com")
            .request_timeout(Duration::from_millis(10))
            .build();
        assert!(too_short.is_err());

        let too_long = builder_with_bridges()
            .base_url("https://api.example.com")
            .request_timeout(Duration::from_secs(3600))
            .build();
        assert!(too_long.is_err());
    }

    #[test]
    fn test_event_buffer_must_be_positive() {
        let result = builder_with_bridges()
            .base_url("https://api.example.com")
            .event_buffer_size(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = builder_with_bridges()
            .base_url("https://api.example.com")
            .build()
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("HttpClient { ... }"));
        assert!(debug.contains("https://api.example.com/"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_bridges_without_desktop_shims() {
        let result = CoreConfig::builder()
            .base_url("https://api.example.com")
            .secure_store(Arc::new(MockSecureStore))
            .build();
        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { capability, .. }) if capability == "HttpClient"
        ));

        let result = CoreConfig::builder()
            .base_url("https://api.example.com")
            .http_client(Arc::new(MockHttpClient))
            .build();
        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { capability, .. }) if capability == "SecureStore"
        ));
    }

    #[cfg(feature = "desktop-shims")]
    #[tokio::test]
    async fn test_build_with_desktop_defaults() {
        let config = CoreConfig::builder()
            .base_url("https://api.example.com")
            .build()
            .expect("desktop defaults should succeed");

        config
            .secure_store
            .set_secret("fallback-check", b"ok")
            .await
            .unwrap();
        assert_eq!(
            config.secure_store.get_secret("fallback-check").await.unwrap(),
            Some(b"ok".to_vec())
        );
    }
}
