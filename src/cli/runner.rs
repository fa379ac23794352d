//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, StoreAction};
use crate::config::ClientSettings;
use crate::error::{Error, Result};
use crate::http::{ApiClient, ApiRequest};
use crate::storage::{FileBackend, SecureStorage};
use reqwest::Method;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let settings = self.load_settings()?;

        match &self.cli.command {
            Commands::Request {
                method,
                path,
                json,
                query,
                header,
            } => {
                let request = build_request(method, path, json.as_deref(), query, header)?;
                self.request(&settings, &request).await
            }
            Commands::Store { file, action } => self.store(&settings, file, action).await,
            Commands::Config => {
                println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
                Ok(())
            }
        }
    }

    /// Load settings from the file flag, or the environment
    fn load_settings(&self) -> Result<ClientSettings> {
        match &self.cli.settings {
            Some(path) => {
                debug!(path = %path.display(), "Loading settings file");
                ClientSettings::from_file(path)
            }
            None => ClientSettings::from_env(),
        }
    }

    async fn request(&self, settings: &ClientSettings, request: &ApiRequest) -> Result<()> {
        let client = ApiClient::new(settings.client_config())?;

        match client.execute(request).await {
            Ok(response) => {
                let body = response
                    .json::<Value>()
                    .unwrap_or_else(|_| Value::String(response.text()));
                print_json(&json!({ "status": response.status(), "body": body }))
            }
            Err(e) => {
                if let Some(payload) = e.json_body() {
                    print_json(&json!({ "status": e.status(), "error": payload }))?;
                }
                Err(e)
            }
        }
    }

    async fn store(&self, settings: &ClientSettings, file: &Path, action: &StoreAction) -> Result<()> {
        let backend = Arc::new(FileBackend::open(file).await?);
        let store = SecureStorage::new(backend, settings.storage_passphrase())?
            .with_policy(settings.corruption_policy);

        match action {
            StoreAction::Put { key, value } => {
                store.put(key, value).await?;
                print_json(&json!({ "key": key, "stored": true }))
            }
            StoreAction::Get { key } => {
                let value = store.get(key).await?;
                print_json(&json!({ "key": key, "value": value }))
            }
            StoreAction::Remove { key } => {
                store.remove(key).await?;
                print_json(&json!({ "key": key, "removed": true }))
            }
            StoreAction::Has { key } => {
                let present = store.has(key).await?;
                print_json(&json!({ "key": key, "present": present }))
            }
            StoreAction::Clear => {
                store.clear().await?;
                print_json(&json!({ "cleared": true }))
            }
        }
    }
}

/// Build a request from CLI arguments
fn build_request(
    method: &str,
    path: &str,
    body: Option<&str>,
    query: &[String],
    headers: &[String],
) -> Result<ApiRequest> {
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|e| Error::invalid_value("method", e.to_string()))?;
    let mut request = ApiRequest::new(method, path);

    for pair in query {
        let (key, value) = split_pair("query", pair)?;
        request = request.query(key, value);
    }
    for pair in headers {
        let (key, value) = split_pair("header", pair)?;
        request = request.header(key, value);
    }
    if let Some(body) = body {
        request = request.json(serde_json::from_str(body)?);
    }

    Ok(request)
}

fn split_pair<'a>(field: &str, pair: &'a str) -> Result<(&'a str, &'a str)> {
    pair.split_once('=')
        .ok_or_else(|| Error::invalid_value(field, format!("expected key=value, got '{pair}'")))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
