//! Typed endpoint helpers
//!
//! Thin wrappers over `ApiClient` for the service's auth, admin and PnL
//! endpoints. Each returns the decoded JSON payload.

use crate::error::Result;
use crate::http::{ApiClient, ApiRequest};
use crate::storage::SecureStorage;
use serde_json::{json, Value};

/// Slot holding the legacy admin API key
pub const ADMIN_KEY_SLOT: &str = "api_admin_key";

impl ApiClient {
    // ============================================================================
    // Authentication
    // ============================================================================

    pub async fn register(&self, email: &str, password: &str) -> Result<Value> {
        self.request_json(
            &ApiRequest::post("/auth/register").json(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Value> {
        self.request_json(
            &ApiRequest::post("/auth/login").json(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn logout(&self) -> Result<Value> {
        self.request_json(&ApiRequest::post("/auth/logout")).await
    }

    /// The signed-in user
    pub async fn current_user(&self) -> Result<Value> {
        self.get_json("/auth/me").await
    }

    /// Explicitly renew the session
    pub async fn refresh_token(&self) -> Result<Value> {
        self.refresh().await?.json()
    }

    // ============================================================================
    // Admin
    // ============================================================================

    pub async fn generate_key(&self, name: &str) -> Result<Value> {
        self.request_json(&ApiRequest::post("/admin/keys").json(json!({ "name": name })))
            .await
    }

    pub async fn list_keys(&self) -> Result<Value> {
        self.get_json("/admin/keys").await
    }

    pub async fn revoke_key(&self, key_id: u64) -> Result<Value> {
        self.request_json(&ApiRequest::delete(format!("/admin/keys/{key_id}")))
            .await
    }

    /// Usage statistics over a window such as `24h`
    pub async fn stats(&self, duration: &str) -> Result<Value> {
        self.request_json(&ApiRequest::get("/admin/stats").query("duration", duration))
            .await
    }

    pub async fn recent_activity(&self, limit: u32) -> Result<Value> {
        self.request_json(&ApiRequest::get("/admin/activity").query("limit", limit.to_string()))
            .await
    }

    pub async fn update_setting(&self, key: &str, value: &str) -> Result<Value> {
        self.request_json(
            &ApiRequest::post("/admin/settings").json(json!({ "key": key, "value": value })),
        )
        .await
    }

    pub async fn settings(&self) -> Result<Value> {
        self.get_json("/admin/settings").await
    }

    // ============================================================================
    // PnL
    // ============================================================================

    /// PnL history using the ambient session
    pub async fn pnl_history(&self, user: &str, builder_only: bool) -> Result<Value> {
        self.request_json(
            &ApiRequest::get("/v1/pnl/history")
                .query("user", user)
                .query("builderOnly", builder_only.to_string()),
        )
        .await
    }

    /// Public leaderboard ranked by `metric` (e.g. `pnl`)
    pub async fn leaderboard(&self, metric: &str) -> Result<Value> {
        self.request_json(&ApiRequest::get("/v1/leaderboard").query("metric", metric))
            .await
    }

    /// Current PnL, authenticated with an explicit API key
    pub async fn pnl(&self, user: &str, api_key: &str) -> Result<Value> {
        self.request_json(&keyed_pnl_request("/v1/pnl", user, api_key))
            .await
    }

    /// PnL history, authenticated with an explicit API key
    pub async fn pnl_history_with_key(&self, user: &str, api_key: &str) -> Result<Value> {
        self.request_json(&keyed_pnl_request("/v1/pnl/history", user, api_key))
            .await
    }
}

fn keyed_pnl_request(path: &str, user: &str, api_key: &str) -> ApiRequest {
    ApiRequest::get(path)
        .query("user", user)
        .query("builderOnly", "true")
        .header("X-API-Key", api_key)
}

/// Whether a legacy admin key slot exists in the store
pub async fn has_admin_key(store: &SecureStorage) -> Result<bool> {
    store.has(ADMIN_KEY_SLOT).await
}
