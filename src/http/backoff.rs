//! Retry decisions and backoff delays
//!
//! The policy is a pure function of the error, the request method and the
//! number of retries already spent. It never touches shared state.

use crate::error::Error;
use rand::Rng;
use reqwest::Method;
use std::time::Duration;

/// Maximum number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Exponential backoff with jitter
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    max_retries: u32,
    base: Duration,
    /// Upper bound of the random extra delay, as a fraction of the computed delay
    jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base: Duration::from_millis(100),
            jitter: 0.2,
        }
    }
}

impl BackoffPolicy {
    /// Create a policy with the given retry ceiling and base delay
    pub fn new(max_retries: u32, base: Duration) -> Self {
        Self {
            max_retries,
            base,
            ..Self::default()
        }
    }

    /// Set the jitter fraction (0.0 disables jitter)
    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.max(0.0);
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    /// Decide whether a failed attempt should be retried.
    ///
    /// `attempt` is the number of retries already spent for this call.
    pub fn should_retry(&self, error: &Error, method: &Method, attempt: u32) -> bool {
        attempt < self.max_retries && is_retry_eligible(error, method)
    }

    /// Delay before retry number `attempt` (0 for the first retry)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.base.saturating_mul(2u32.saturating_pow(attempt));
        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let extra = rand::thread_rng().gen_range(0.0..=self.jitter);
        delay + delay.mul_f64(extra)
    }
}

/// Whether the error class is one that retrying can fix
pub fn is_retry_eligible(error: &Error, method: &Method) -> bool {
    match error {
        // No response at all: the server never acted, so any method is safe
        Error::Network { .. } | Error::Timeout { .. } => true,
        Error::HttpStatus { status, .. } => is_idempotent(method) && is_retryable_status(*status),
        // The server already acted on the request
        Error::BodyRead { .. } => is_idempotent(method),
        _ => false,
    }
}

/// GET, HEAD, OPTIONS, PUT and DELETE
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE
    )
}

/// 429 and every 5xx
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}
