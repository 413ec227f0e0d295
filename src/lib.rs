//! Workspace umbrella crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates. Host applications can depend on `foundation-workspace`
//! and enable `desktop-shims` to get the reqwest transport and in-memory
//! secure store wired in by default.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
