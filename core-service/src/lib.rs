//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges from [`CoreConfig`] (HTTP
//! transport, secure storage, clock) into the session credential service, the
//! shared refresh coordinator, and an authenticated [`ApiClient`]. Desktop
//! apps typically enable the `desktop-shims` feature, which lets the config
//! fall back to the reqwest transport and the in-memory secure store.

pub mod error;

pub use error::{CoreError, Result};

pub use bridge_traits::http::{HttpMethod, HttpRequest, HttpResponse};
pub use core_auth::{SessionCredentialService, SessionTokens};
pub use core_network::{ApiClient, Endpoint, RequestTask};
pub use core_runtime::{CoreConfig, CoreEvent, EventBus};

use std::sync::Arc;

use core_auth::{CredentialService, RefreshCoordinator, TokenLifetimes};
use core_network::{
    AuthenticationCheckInterceptor, Authorizer, HeaderInterceptor, TokenRefreshInterceptor,
};
use tracing::info;

struct ServiceInner {
    config: CoreConfig,
    events: EventBus,
    credentials: Arc<SessionCredentialService>,
    refresh_coordinator: Arc<RefreshCoordinator>,
    api_client: ApiClient,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

impl CoreService {
    /// Builds the credential service, refresh coordinator and API client
    /// from `config`.
    ///
    /// The authenticated client runs every request through the user-agent
    /// header, the session check and the refresh step (only when the access
    /// token is about to expire), then attaches the bearer token.
    pub fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);

        let credentials = Arc::new(
            SessionCredentialService::from_config(&config)?.with_event_bus(events.clone()),
        );
        let dyn_credentials: Arc<dyn CredentialService> = credentials.clone();

        let refresh_coordinator = Arc::new(
            RefreshCoordinator::new(
                Arc::clone(&dyn_credentials),
                TokenLifetimes::from_config(&config),
            )
            .with_event_bus(events.clone()),
        );

        let api_client = ApiClient::builder(Arc::clone(&config.http_client))
            .base_url(config.base_url.as_str())
            .timeout(config.request_timeout)
            .event_bus(events.clone())
            .interceptor(Arc::new(HeaderInterceptor::user_agent(
                config.user_agent.clone(),
            )))
            .interceptor(Arc::new(AuthenticationCheckInterceptor::new(Arc::clone(
                &dyn_credentials,
            ))))
            .interceptor(Arc::new(
                TokenRefreshInterceptor::new(Arc::clone(&refresh_coordinator))
                    .only_when_expiring(),
            ))
            .authorizer(Authorizer::new(dyn_credentials))
            .build()?;

        info!(base_url = %config.base_url, "Core service initialized");

        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                events,
                credentials,
                refresh_coordinator,
                api_client,
            }),
        })
    }

    /// Client for the authenticated API.
    pub fn api_client(&self) -> &ApiClient {
        &self.inner.api_client
    }

    /// Client for endpoints that need no session, such as sign-in.
    pub fn anonymous_client(&self) -> Result<ApiClient> {
        let config = &self.inner.config;
        let client = ApiClient::builder(Arc::clone(&config.http_client))
            .base_url(config.base_url.as_str())
            .timeout(config.request_timeout)
            .event_bus(self.inner.events.clone())
            .interceptor(Arc::new(HeaderInterceptor::user_agent(
                config.user_agent.clone(),
            )))
            .build()?;
        Ok(client)
    }

    pub fn credentials(&self) -> &Arc<SessionCredentialService> {
        &self.inner.credentials
    }

    pub fn refresh_coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.inner.refresh_coordinator
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }
}

/// Bootstraps a service with the desktop transport and secure store.
///
/// ```no_run
/// # fn example() -> core_service::Result<()> {
/// let core = core_service::bootstrap_desktop("https://api.example.com")?;
/// let client = core.api_client().clone();
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(base_url: &str) -> Result<CoreService> {
    let config = CoreConfig::builder().base_url(base_url).build()?;
    CoreService::bootstrap(config)
}
