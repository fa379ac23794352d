//! Client settings
//!
//! `ClientSettings` is the serializable, user-facing configuration. It can be
//! loaded from a YAML or JSON file, from a string, or from the environment,
//! and is turned into a runtime `ClientConfig` for the request pipeline.

use crate::auth::{AuthEndpoints, DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH};
use crate::error::{Error, Result, ResultExt};
use crate::http::{ClientConfig, DEFAULT_MAX_RETRIES};
use crate::storage::CorruptionPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Passphrase used when none is configured
pub const DEFAULT_ENCRYPTION_KEY: &str = "default-key-change-in-production";

/// Environment variable overriding the base URL
pub const ENV_BASE_URL: &str = "SESSIONGUARD_BASE_URL";
/// Environment variable overriding the per-request timeout (milliseconds)
pub const ENV_TIMEOUT_MS: &str = "SESSIONGUARD_TIMEOUT_MS";
/// Environment variable holding the storage passphrase
pub const ENV_ENCRYPTION_KEY: &str = "SESSIONGUARD_ENCRYPTION_KEY";

/// Client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Prefix for relative paths; when empty, only absolute URLs can be requested
    pub base_url: String,

    /// Per-request deadline in milliseconds
    pub timeout_ms: u64,

    /// Passphrase for the credential store
    pub encryption_key: String,

    /// Delay before the first retry, in milliseconds
    pub backoff_base_ms: u64,

    /// Refresh endpoint path
    pub refresh_path: String,

    /// Login endpoint path
    pub login_path: String,

    /// What the credential store does with undecryptable slots
    pub corruption_policy: CorruptionPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: 10_000,
            encryption_key: DEFAULT_ENCRYPTION_KEY.to_string(),
            backoff_base_ms: 100,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            corruption_policy: CorruptionPolicy::default(),
        }
    }
}

impl ClientSettings {
    /// Load settings from a YAML or JSON file (by extension)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let settings: Self = if is_json {
            serde_json::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML string (JSON is valid YAML)
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults overridden by `SESSIONGUARD_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = timeout
                .trim()
                .parse()
                .map_err(|e| Error::invalid_value(ENV_TIMEOUT_MS, format!("{e}")))?;
        }
        if let Some(key) = lookup(ENV_ENCRYPTION_KEY) {
            self.encryption_key = key;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.is_empty() {
            url::Url::parse(&self.base_url)?;
        }
        if self.timeout_ms == 0 {
            return Err(Error::invalid_value("timeoutMs", "must be greater than zero"));
        }
        if self.encryption_key.is_empty() {
            return Err(Error::invalid_value("encryptionKey", "must not be empty"));
        }
        Ok(())
    }

    /// Whether the built-in passphrase is in use
    pub fn uses_default_encryption_key(&self) -> bool {
        self.encryption_key == DEFAULT_ENCRYPTION_KEY
    }

    /// Runtime config for the request pipeline
    pub fn client_config(&self) -> ClientConfig {
        let mut builder = ClientConfig::builder()
            .timeout(Duration::from_millis(self.timeout_ms))
            .max_retries(DEFAULT_MAX_RETRIES)
            .backoff(Duration::from_millis(self.backoff_base_ms), 0.2)
            .auth_endpoints(AuthEndpoints::new(
                self.refresh_path.clone(),
                self.login_path.clone(),
            ));
        if !self.base_url.is_empty() {
            builder = builder.base_url(self.base_url.clone());
        }
        builder.build()
    }

    /// Passphrase for the credential store, warning when it is the default
    pub fn storage_passphrase(&self) -> &str {
        if self.uses_default_encryption_key() {
            warn!("Using the default encryption key; set {ENV_ENCRYPTION_KEY} in production");
        }
        &self.encryption_key
    }

    /// Copy safe to print
    pub fn redacted(&self) -> Self {
        Self {
            encryption_key: "[REDACTED]".to_string(),
            ..self.clone()
        }
    }
}
