//! Request and response types
//!
//! `ApiRequest` is the immutable description of what the caller asked for.
//! Per-attempt bookkeeping lives in `AttemptContext`, which the pipeline
//! threads through each retry instead of mutating the request.

use crate::error::{Error, Result};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// A request as described by the caller
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Target path (relative to the base URL) or absolute URL
    pub path: String,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Query parameters
    pub query: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Create a request for the given method and path
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HashMap::new(),
            query: HashMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Path without query string or trailing slash
    pub fn route(&self) -> &str {
        let path = self.path.split('?').next().unwrap_or_default();
        path.trim_end_matches('/')
    }
}

/// Per-call retry bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptContext {
    /// Number of backoff retries already spent (0 on the first dispatch)
    pub attempt: u32,
    /// Whether this call has already been replayed after a credential refresh
    pub auth_retry_attempted: bool,
}

impl AttemptContext {
    /// Context for a call that already used its auth replay
    pub fn auth_retried() -> Self {
        Self {
            attempt: 0,
            auth_retry_attempted: true,
        }
    }

    /// Context for the next backoff retry
    #[must_use]
    pub fn next_attempt(self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self
        }
    }

    /// Context for the single replay after a refresh; the backoff budget starts over
    #[must_use]
    pub fn for_auth_replay(self) -> Self {
        Self::auth_retried()
    }
}

/// A normalized request ready for the transport
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    /// Fully qualified URL
    pub url: String,
    /// Default headers merged with request headers (request wins)
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
    /// Per-call deadline
    pub timeout: Duration,
}

/// A response with its body already read
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Numeric status code
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// True for 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Raw body bytes
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body as (lossy) UTF-8 text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return serde_json::from_str("null").map_err(Error::JsonParse);
        }
        serde_json::from_slice(&self.body).map_err(Error::JsonParse)
    }

    /// Convert a non-success response into the matching error
    pub fn into_error(self) -> Error {
        let body = self.text();
        Error::http_status(self.status, body)
    }
}
