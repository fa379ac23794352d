//! Scripted in-memory transport for pipeline tests

use super::transport::Transport;
use super::types::{ApiResponse, PreparedRequest};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// One scripted transport outcome
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Respond(u16, String),
    Network,
    Timeout,
    /// Status line arrives, then the connection drops mid-body
    TruncatedBody(u16),
    /// 401 until a `GrantSession` step has run, 200 afterwards
    RequireSession,
    /// 200, and marks the session valid
    GrantSession,
    /// Wait for the notify before running the inner step
    Gated(Arc<Notify>, Box<Step>),
}

impl Step {
    pub(crate) fn ok() -> Self {
        Step::Respond(200, r#"{"ok":true}"#.to_string())
    }

    pub(crate) fn status(status: u16) -> Self {
        Step::Respond(status, format!(r#"{{"status":{status}}}"#))
    }
}

/// Transport that replays per-URL scripts and records every call
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallbacks: Mutex<HashMap<String, Step>>,
    calls: Mutex<Vec<(Method, String)>>,
    session_valid: AtomicBool,
    latency: Duration,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Delay every response, so concurrent calls overlap
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue steps for a URL; they are consumed in order
    pub(crate) fn script(self, url: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .entry(url.to_string())
            .or_default()
            .extend(steps);
        self
    }

    /// Step used once the URL's queue is empty
    pub(crate) fn fallback(self, url: &str, step: Step) -> Self {
        self.fallbacks.lock().insert(url.to_string(), step);
        self
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|(_, u)| u == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    fn next_step(&self, url: &str) -> Step {
        if let Some(step) = self.scripts.lock().get_mut(url).and_then(VecDeque::pop_front) {
            return step;
        }
        self.fallbacks
            .lock()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Step::Respond(404, "no script".to_string()))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<ApiResponse> {
        self.calls
            .lock()
            .push((request.method.clone(), request.url.clone()));
        let mut step = self.next_step(&request.url);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        loop {
            return match step {
                Step::Gated(gate, inner) => {
                    gate.notified().await;
                    step = *inner;
                    continue;
                }
                Step::Respond(status, body) => Ok(response(status, body)),
                Step::Network => Err(Error::network("connection refused")),
                Step::TruncatedBody(status) => {
                    Err(Error::body_read(status, "connection closed mid-body"))
                }
                Step::Timeout => Err(Error::Timeout {
                    timeout_ms: request.timeout.as_millis() as u64,
                }),
                Step::RequireSession => {
                    if self.session_valid.load(Ordering::SeqCst) {
                        Ok(response(200, r#"{"ok":true}"#.to_string()))
                    } else {
                        Ok(response(401, r#"{"detail":"expired"}"#.to_string()))
                    }
                }
                Step::GrantSession => {
                    self.session_valid.store(true, Ordering::SeqCst);
                    Ok(response(200, "{}".to_string()))
                }
            };
        }
    }
}

fn response(status: u16, body: String) -> ApiResponse {
    ApiResponse::new(status, HeaderMap::new(), Bytes::from(body))
}
