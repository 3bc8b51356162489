//! The authenticated-request path. Every call into the backend goes through
//! `ApiClient`: it attaches the bearer token, detects expiry, performs a
//! single-flight refresh against the cookie-held refresh credential, retries
//! the original request exactly once, and announces session changes on the
//! bus. Callers never handle tokens themselves.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::session::{spawn_sync, Session, SessionBus, SessionEvent, SessionStore};

pub struct ApiClient {
    http: reqwest::Client,
    cfg: ClientConfig,
    store: Arc<SessionStore>,
    bus: SessionBus,
    /// Identifies this instance on the bus so it never re-applies its own events.
    origin: Uuid,
    // Single-flight gate: at most one refresh in flight; latecomers queue
    // here and re-check the store generation once they hold the lock.
    refresh_gate: Mutex<()>,
}

impl ApiClient {
    /// Client with a private bus (single-instance use).
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        Self::with_bus(cfg, SessionBus::new())
    }

    /// Client joined to an existing bus so session changes propagate to and
    /// from other live instances. Must be called inside a tokio runtime
    /// (the bus listener is a spawned task).
    pub fn with_bus(cfg: ClientConfig, bus: SessionBus) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(cfg.timeout)
            .build()
            .context("failed to build HTTP client")?;
        let store = Arc::new(SessionStore::open(cfg.state_dir.as_deref()));
        let origin = Uuid::new_v4();
        // Detached on purpose; the task stops itself once the store is dropped.
        let _ = spawn_sync(&bus, &store, origin);
        Ok(Self { http, cfg, store, bus, origin, refresh_gate: Mutex::new(()) })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.cfg
    }

    pub fn session(&self) -> Session {
        self.store.snapshot()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub(crate) fn store(&self) -> &SessionStore {
        &self.store
    }

    // ---- typed verbs over the authenticated path ----

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request_json(Method::GET, path, None).await
    }

    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> ApiResult<T> {
        self.request_json(Method::POST, path, Some(body)).await
    }

    pub async fn put_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> ApiResult<T> {
        self.request_json(Method::PUT, path, Some(body)).await
    }

    pub async fn post_unit(&self, path: &str, body: Value) -> ApiResult<()> {
        self.request_unit(Method::POST, path, Some(body)).await
    }

    pub async fn put_unit(&self, path: &str, body: Value) -> ApiResult<()> {
        self.request_unit(Method::PUT, path, Some(body)).await
    }

    pub async fn delete_unit(&self, path: &str) -> ApiResult<()> {
        self.request_unit(Method::DELETE, path, None).await
    }

    /// Issue a request and decode the JSON success payload.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ApiResult<T> {
        let resp = self.execute(method, path, body).await?;
        if !resp.status().is_success() {
            return Err(Self::into_error(resp).await);
        }
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::decode(format!("unexpected payload from {}: {}", path, e)))
    }

    /// Issue a request and discard the success payload.
    pub async fn request_unit(&self, method: Method, path: &str, body: Option<Value>) -> ApiResult<()> {
        let resp = self.execute(method, path, body).await?;
        if !resp.status().is_success() {
            return Err(Self::into_error(resp).await);
        }
        Ok(())
    }

    // The core of the facade. On a 401 for an authenticated request the
    // refresh protocol runs, then the request is reissued with the new
    // token. The retried response is returned as-is: a second 401 surfaces
    // as an error and never triggers a second refresh.
    async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> ApiResult<reqwest::Response> {
        let url = self.cfg.endpoint(path);
        let seen_gen = self.store.generation();
        let token = self.store.token();
        let authed = token.is_some();

        let resp = self.dispatch(method.clone(), &url, body.as_ref(), token.as_deref()).await?;
        if resp.status() != StatusCode::UNAUTHORIZED || !authed {
            return Ok(resp);
        }

        tracing::debug!(target: "brightafrica::client", "401 on {} {}, running refresh", method, path);
        self.refresh_after_expiry(seen_gen).await?;

        let token = self.store.token();
        self.dispatch(method, &url, body.as_ref(), token.as_deref()).await
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> ApiResult<reqwest::Response> {
        let mut req = self.http.request(method, url);
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        if let Some(b) = body {
            req = req.json(b);
        }
        Ok(req.send().await?)
    }

    /// Single-flight refresh. `seen_gen` is the store generation the caller
    /// observed when it sent the request that expired; if the generation
    /// moved while queueing for the gate, another caller already resolved
    /// the expiry and this one just adopts the outcome.
    async fn refresh_after_expiry(&self, seen_gen: u64) -> ApiResult<()> {
        let _guard = self.refresh_gate.lock().await;
        if self.store.generation() != seen_gen {
            return if self.store.is_authenticated() {
                Ok(())
            } else {
                Err(ApiError::auth_rejected("session ended while awaiting refresh"))
            };
        }

        let outcome = self.mint_access_token().await;
        match outcome {
            Ok(token) => {
                self.store.set_token(token.clone());
                self.bus.publish(SessionEvent::TokenRefreshed { origin: self.origin, token });
                tracing::info!(target: "brightafrica::client", "access token refreshed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(target: "brightafrica::client", "token refresh failed: {}", e);
                self.sign_out_local();
                Err(ApiError::auth_rejected(e.message().to_string()))
            }
        }
    }

    // No bearer on this call; the transport's cookie jar carries the
    // long-lived refresh credential.
    async fn mint_access_token(&self) -> ApiResult<String> {
        let url = self.cfg.endpoint("/auth/refresh-token");
        let resp = self.http.post(&url).json(&serde_json::json!({})).send().await?;
        if !resp.status().is_success() {
            return Err(Self::into_error(resp).await);
        }
        let v: Value = resp.json().await.map_err(ApiError::from)?;
        v.get("accessToken")
            .and_then(|t| t.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::decode("refresh response missing accessToken"))
    }

    /// Clear local session state and tell the other instances. Server-side
    /// invalidation is `auth::logout`'s concern.
    pub(crate) fn sign_out_local(&self) {
        self.store.clear();
        self.bus.publish(SessionEvent::SignedOut { origin: self.origin });
    }

    pub(crate) fn announce_signed_in(&self, token: String) {
        self.bus.publish(SessionEvent::SignedIn { origin: self.origin, token });
    }

    /// Map a non-2xx response to the client taxonomy, preferring the
    /// server's own `message` field.
    pub(crate) async fn into_error(resp: reqwest::Response) -> ApiError {
        let status = resp.status().as_u16();
        let message = resp
            .json::<Value>()
            .await
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(|s| s.to_string()));
        ApiError::from_status(status, message)
    }

    // Raw POST outside the authenticated path, for endpoints that must not
    // carry a bearer (login) or whose failure handling differs.
    pub(crate) async fn post_raw(&self, path: &str, body: &Value) -> ApiResult<reqwest::Response> {
        let url = self.cfg.endpoint(path);
        Ok(self.http.post(&url).json(body).send().await?)
    }
}
