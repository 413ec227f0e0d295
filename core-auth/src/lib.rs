//! # Authentication Module
//!
//! Session credentials and the single-flight token refresh used by the
//! network layer.
//!
//! ## Overview
//!
//! - [`CredentialService`]: contract for whoever owns session state
//! - [`SessionCredentialService`]: stored session renewed through an HTTP
//!   refresh endpoint
//! - [`RefreshCoordinator`]: collapses concurrent refresh requests into one
//!   exchange
//! - [`TokenStore`]: secure persistence of the token pair
//!
//! ## Usage
//!
//! ```ignore
//! use core_auth::{RefreshCoordinator, SessionCredentialService, TokenLifetimes};
//! use std::sync::Arc;
//!
//! let credentials = Arc::new(SessionCredentialService::from_config(&config)?);
//! let coordinator = RefreshCoordinator::new(credentials, TokenLifetimes::from_config(&config));
//!
//! // Any number of concurrent callers share one refresh.
//! coordinator.refresh().await?;
//! ```

pub mod credentials;
pub mod error;
pub mod refresh;
pub mod session;
pub mod token_store;
pub mod types;

pub use credentials::CredentialService;
pub use error::{AuthError, Result};
pub use refresh::RefreshCoordinator;
pub use session::SessionCredentialService;
pub use token_store::{TokenStore, SESSION_TOKENS_KEY};
pub use types::{AuthState, SessionTokens, TokenLifetimes};
