// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

//! # sessionguard
//!
//! Session-aware HTTP client: transient failures are retried with bounded
//! exponential backoff, an expired session is refreshed exactly once no
//! matter how many requests notice it at the same time, and credentials kept
//! on disk are always encrypted.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sessionguard::{ApiClient, ClientSettings, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let settings = ClientSettings::from_env()?;
//!     let client = ApiClient::new(settings.client_config())?;
//!
//!     client.login("me@example.com", "hunter2").await?;
//!
//!     // A 401 here refreshes the session once and replays the call
//!     let me = client.current_user().await?;
//!     println!("{me}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! caller ──► ApiClient::execute ──► Transport ──► server
//!                 │        ▲
//!        transient│        │replay once
//!                 ▼        │
//!          BackoffPolicy   RefreshCoordinator ──► POST /auth/refresh
//!
//! SecureStorage ──► SecretCipher (AES-256-GCM) ──► KeyValueBackend
//! ```

#![warn(clippy::all)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Request pipeline with retry and backoff
pub mod http;

/// Single-flight session refresh
pub mod auth;

/// Encrypted credential storage
pub mod storage;

/// Client settings
pub mod config;

/// Typed endpoint helpers
pub mod api;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use auth::{AuthEndpoints, RefreshCoordinator};
pub use config::ClientSettings;
pub use error::{Error, Result};
pub use http::{ApiClient, ApiRequest, ApiResponse, AttemptContext, ClientConfig, Transport};
pub use storage::{CorruptionPolicy, SecureStorage};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
