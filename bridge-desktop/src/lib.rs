//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `SecureStore` kept in process memory
//! - `LoggerSink` appending to a log file via `tokio::fs`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileLoggerSink, MemorySecureStore, ReqwestHttpClient};
//! use bridge_traits::LogLevel;
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let secure_store = MemorySecureStore::new();
//!     let file_sink = FileLoggerSink::open("logs/app.log", LogLevel::Info).await?;
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```

mod file_logger;
mod http;
mod secure_store;

pub use file_logger::FileLoggerSink;
pub use http::ReqwestHttpClient;
pub use secure_store::MemorySecureStore;
