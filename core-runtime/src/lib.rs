//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure shared by the auth and
//! network layers:
//! - Logging and tracing infrastructure with pluggable sinks
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the configuration surface, logging conventions, and event
//! broadcasting used throughout the workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{AuthEvent, CoreEvent, EventBus, NetworkEvent};
