//! HTTP client module
//!
//! Provides the request pipeline used for every call to the API.
//!
//! # Features
//!
//! - **Automatic Retries**: transient failures are retried with exponential backoff
//! - **Method Safety**: status-code retries only apply to idempotent methods
//! - **Session Refresh**: a 401 triggers one shared refresh, then a single replay
//! - **Transport Seam**: the pipeline runs over any `Transport` implementation

mod backoff;
mod client;
mod transport;
mod types;

pub use backoff::{
    is_idempotent, is_retry_eligible, is_retryable_status, BackoffPolicy, DEFAULT_MAX_RETRIES,
};
pub use client::{ApiClient, ClientConfig, ClientConfigBuilder};
pub use transport::{ReqwestTransport, Transport};
pub use types::{ApiRequest, ApiResponse, AttemptContext, PreparedRequest};

#[cfg(test)]
pub(crate) mod testing;
