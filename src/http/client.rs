//! Request pipeline
//!
//! Wraps a `Transport` and handles:
//! - Request normalization (base URL, default headers, timeout)
//! - Automatic retries with exponential backoff for transient failures
//! - A single credential refresh and replay when the session has expired

use super::backoff::{BackoffPolicy, DEFAULT_MAX_RETRIES};
use super::transport::{ReqwestTransport, Transport};
use super::types::{ApiRequest, ApiResponse, AttemptContext, PreparedRequest};
use crate::auth::{AuthEndpoints, RefreshCoordinator};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for relative paths
    pub base_url: Option<String>,
    /// Per-call timeout
    pub timeout: Duration,
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub backoff_base: Duration,
    /// Random extra delay, as a fraction of the backoff delay
    pub backoff_jitter: f64,
    /// Refresh endpoint and the endpoints exempt from the refresh trigger
    pub auth: AuthEndpoints,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut default_headers = HashMap::new();
        default_headers.insert("Content-Type".to_string(), "application/json".to_string());

        Self {
            base_url: None,
            timeout: Duration::from_secs(10),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(100),
            backoff_jitter: 0.2,
            auth: AuthEndpoints::default(),
            default_headers,
            user_agent: format!("sessionguard/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Backoff policy described by this config
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.max_retries, self.backoff_base).with_jitter(self.backoff_jitter)
    }
}

/// Builder for client config
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff base delay and jitter fraction
    pub fn backoff(mut self, base: Duration, jitter: f64) -> Self {
        self.config.backoff_base = base;
        self.config.backoff_jitter = jitter;
        self
    }

    /// Set the auth endpoints
    pub fn auth_endpoints(mut self, endpoints: AuthEndpoints) -> Self {
        self.config.auth = endpoints;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// HTTP client with retry and single-flight session refresh
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    backoff: BackoffPolicy,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    /// Create a client backed by reqwest
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.user_agent)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let backoff = config.backoff_policy();
        Self {
            config,
            transport,
            backoff,
            refresh: RefreshCoordinator::new(),
        }
    }

    /// Get the client config
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the refresh coordinator owned by this client
    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.execute(&ApiRequest::get(path)).await
    }

    /// Make a POST request
    pub async fn post(&self, path: &str, body: Value) -> Result<ApiResponse> {
        self.execute(&ApiRequest::post(path).json(body)).await
    }

    /// Make a PUT request
    pub async fn put(&self, path: &str, body: Value) -> Result<ApiResponse> {
        self.execute(&ApiRequest::put(path).json(body)).await
    }

    /// Make a PATCH request
    pub async fn patch(&self, path: &str, body: Value) -> Result<ApiResponse> {
        self.execute(&ApiRequest::patch(path).json(body)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.execute(&ApiRequest::delete(path)).await
    }

    /// Make a request and parse the JSON response
    pub async fn request_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        self.execute(request).await?.json()
    }

    /// Make a GET request and parse the JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json(&ApiRequest::get(path)).await
    }

    /// Run a request through the full pipeline
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.execute_with_context(request, AttemptContext::default())
            .await
    }

    /// Run a request starting from an explicit attempt context
    pub async fn execute_with_context(
        &self,
        request: &ApiRequest,
        ctx: AttemptContext,
    ) -> Result<ApiResponse> {
        let prepared = self.prepare(request);
        let mut ctx = ctx;

        loop {
            match self.dispatch(&prepared, ctx).await {
                Err(err) if err.is_auth_expired() && self.should_refresh(request, ctx) => {
                    self.refresh_session().await?;
                    ctx = ctx.for_auth_replay();
                    info!("Replaying {} {} after refresh", prepared.method, prepared.url);
                }
                other => return other,
            }
        }
    }

    /// Call the refresh endpoint directly, outside of the coordinator
    pub async fn refresh(&self) -> Result<ApiResponse> {
        self.execute(&ApiRequest::post(self.config.auth.refresh_path.clone()))
            .await
    }

    /// Whether a 401 on this request may trigger a refresh
    fn should_refresh(&self, request: &ApiRequest, ctx: AttemptContext) -> bool {
        if ctx.auth_retry_attempted {
            debug!("{} already replayed after refresh, giving up", request.path);
            return false;
        }
        !self.config.auth.is_exempt(request.route())
    }

    /// Refresh the session, joining an in-flight refresh if there is one
    async fn refresh_session(&self) -> Result<()> {
        let prepared = self.prepare(&ApiRequest::post(self.config.auth.refresh_path.clone()));
        let refresh_request = &prepared;

        self.refresh
            .run(|| async move {
                self.dispatch(refresh_request, AttemptContext::default())
                    .await
                    .map(|_| ())
            })
            .await
            .map_err(Error::token_refresh)
    }

    /// Send a request, retrying transient failures
    async fn dispatch(&self, request: &PreparedRequest, ctx: AttemptContext) -> Result<ApiResponse> {
        let mut ctx = ctx;

        loop {
            let error = match self.transport.send(request).await {
                Ok(response) if response.is_success() => {
                    debug!(
                        "{} {} - {}",
                        request.method,
                        request.url,
                        response.status()
                    );
                    return Ok(response);
                }
                Ok(response) => response.into_error(),
                Err(e) => e,
            };

            if !self.backoff.should_retry(&error, &request.method, ctx.attempt) {
                match error.status() {
                    Some(status) => warn!("{} {} - {}", request.method, request.url, status),
                    None => warn!("{} {} - {}", request.method, request.url, error),
                }
                return Err(error);
            }

            let delay = self.backoff.delay_for(ctx.attempt);
            warn!(
                "Request failed ({}), attempt {}/{}, retrying {} in {:?}",
                error,
                ctx.attempt + 1,
                self.backoff.max_retries() + 1,
                request.url,
                delay
            );
            tokio::time::sleep(delay).await;
            ctx = ctx.next_attempt();
        }
    }

    /// Normalize a request for the transport
    fn prepare(&self, request: &ApiRequest) -> PreparedRequest {
        let mut headers = self.config.default_headers.clone();
        for (key, value) in &request.headers {
            headers.insert(key.clone(), value.clone());
        }

        PreparedRequest {
            method: request.method.clone(),
            url: self.build_url(&request.path),
            headers,
            query: request.query.clone(),
            body: request.body.clone(),
            timeout: self.config.timeout,
        }
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) if !base.is_empty() => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            _ => path.to_string(),
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("backoff", &self.backoff)
            .field("refreshing", &self.refresh.is_refreshing())
            .finish_non_exhaustive()
    }
}
