//! Transport seam
//!
//! The pipeline only ever talks to a `Transport`. A transport returns every
//! response it receives, whatever the status. It fails with `Network` or
//! `Timeout` when no response arrived, and with `BodyRead` when the status
//! line arrived but the body did not.

use super::types::{ApiResponse, PreparedRequest};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Sends a prepared request and returns the raw response
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request.
    ///
    /// Errors must be `Error::Network` or `Error::Timeout` for failures where
    /// no response was received.
    async fn send(&self, request: &PreparedRequest) -> Result<ApiResponse>;
}

/// reqwest-backed transport with a cookie store for ambient session cookies
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with its own client
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .cookie_store(true)
            .build()
            .map_err(Error::Http)?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<ApiResponse> {
        let url = match url::Url::parse(&request.url) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                return Err(Error::config(format!(
                    "relative path '{}' requires baseUrl",
                    request.url
                )));
            }
            Err(e) => return Err(Error::InvalidUrl(e)),
        };

        let mut req = self
            .client
            .request(request.method.clone(), url)
            .timeout(request.timeout);

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        if let Some(ref body) = request.body {
            req = req.json(body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| classify(e, request.timeout))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        // The server has answered, so this is not a "no response" failure
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::body_read(status, e.to_string()))?;

        Ok(ApiResponse::new(status, headers, body))
    }
}

/// Map a reqwest failure onto the transport error classes
fn classify(e: reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        return Error::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        };
    }
    if e.is_builder() {
        return Error::Http(e);
    }
    Error::network(e.to_string())
}
