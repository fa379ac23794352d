//! Refresh coordination types

use crate::error::Error;
use std::sync::Arc;

/// Outcome of one refresh attempt, shared by the leader and every waiter
pub type RefreshOutcome = std::result::Result<(), Arc<Error>>;

/// Default path of the credential refresh endpoint
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Default path of the login endpoint
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";

/// Endpoints whose 401 responses never trigger a refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    /// Refresh endpoint, called with POST and no body
    pub refresh_path: String,
    /// Endpoints (refresh included) exempt from the 401 trigger
    pub exempt_paths: Vec<String>,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_PATH, DEFAULT_LOGIN_PATH)
    }
}

impl AuthEndpoints {
    /// Build the endpoint set from a refresh path and a login path
    pub fn new(refresh_path: impl Into<String>, login_path: impl Into<String>) -> Self {
        let refresh_path = normalize(&refresh_path.into());
        let login_path = normalize(&login_path.into());
        Self {
            exempt_paths: vec![refresh_path.clone(), login_path],
            refresh_path,
        }
    }

    /// Exempt an additional endpoint
    #[must_use]
    pub fn exempt(mut self, path: impl Into<String>) -> Self {
        let path = normalize(&path.into());
        if !self.exempt_paths.contains(&path) {
            self.exempt_paths.push(path);
        }
        self
    }

    /// Whether a 401 on `route` must be surfaced instead of triggering a refresh
    pub fn is_exempt(&self, route: &str) -> bool {
        let route = normalize(route);
        self.exempt_paths
            .iter()
            .any(|exempt| route == *exempt || route.ends_with(exempt.as_str()))
    }
}

fn normalize(path: &str) -> String {
    let path = path.split('?').next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.starts_with('/') || trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
