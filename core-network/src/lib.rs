//! # Network Module
//!
//! Request pipeline between application code and the HTTP transport.
//!
//! ## Overview
//!
//! - [`Interceptor`] / [`InterceptorChain`]: ordered validation and rewriting
//!   of outgoing requests; the first failure aborts the request
//! - Built-in interceptors: [`AuthenticationCheckInterceptor`],
//!   [`TokenRefreshInterceptor`], [`HeaderInterceptor`], [`FnInterceptor`]
//! - [`Authorizer`]: attaches the bearer token after the chain ran
//! - [`ApiClient`] / [`RequestTask`]: request execution with an explicit
//!   lifecycle ([`RequestState`]) and cancellation
//! - [`Endpoint`]: typed request description with a JSON response
//!
//! ## Usage
//!
//! ```ignore
//! use core_network::{ApiClient, Authorizer, AuthenticationCheckInterceptor, TokenRefreshInterceptor};
//! use std::sync::Arc;
//!
//! let client = ApiClient::builder(transport)
//!     .base_url("https://api.example.com")
//!     .interceptor(Arc::new(AuthenticationCheckInterceptor::new(credentials.clone())))
//!     .interceptor(Arc::new(TokenRefreshInterceptor::new(coordinator).only_when_expiring()))
//!     .authorizer(Authorizer::new(credentials))
//!     .build()?;
//!
//! let response = client.execute(HttpRequest::get("users/me")).await?;
//! ```

pub mod authorization;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod interceptor;
pub mod interceptors;
pub mod request_state;

pub use authorization::Authorizer;
pub use client::{ApiClient, ApiClientBuilder, RequestTask};
pub use endpoint::Endpoint;
pub use error::{NetworkError, Result};
pub use interceptor::{Interceptor, InterceptorChain};
pub use interceptors::{
    AuthenticationCheckInterceptor, FnInterceptor, HeaderInterceptor, RefreshPolicy,
    TokenRefreshInterceptor,
};
pub use request_state::{RequestLifecycle, RequestState};
