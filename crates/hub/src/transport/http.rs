// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client with bearer attachment and the 401 refresh interceptor.
//!
//! Request path: a valid access token is attached as a bearer credential;
//! an expired or absent one means the request goes out unauthenticated.
//! Response path: a 401 triggers at most one refresh exchange system-wide
//! (coordinated by [`RefreshGate`]) followed by a single replay of the
//! original request. A request that fails again after its replay is
//! propagated, never retried further.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{normalize_error, ApiError};
use crate::session::manager::SessionManager;
use crate::session::token;
use crate::transport::gate::{RefreshGate, RefreshRole};

/// Body returned by the refresh exchange endpoint (not enveloped).
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// A request in replayable form: the interceptor may need to send it a
/// second time with a fresh bearer token.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestSpec {
    pub fn get(path: impl Into<String>) -> Self {
        Self { method: Method::GET, path: path.into(), query: Vec::new(), body: None }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self { method: Method::POST, path: path.into(), query: Vec::new(), body: Some(body) }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self { method: Method::DELETE, path: path.into(), query: Vec::new(), body: None }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

/// HTTP client wrapper for the application backend.
pub struct ApiClient {
    base_url: String,
    http: Client,
    session: Arc<SessionManager>,
    gate: RefreshGate,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<SessionManager>, timeout: Duration) -> Self {
        let http = Client::builder().timeout(timeout).build().unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            http,
            session,
            gate: RefreshGate::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request through the interceptor and deserialize the body.
    pub async fn send<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T, ApiError> {
        let value = self.dispatch(spec).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Core request path with the 401 state machine.
    async fn dispatch(&self, spec: RequestSpec) -> Result<Value, ApiError> {
        let bearer = match self.session.access_token().await {
            Some(tok) if !token::is_expired(&tok) => Some(tok),
            _ => None,
        };
        let (status, body) = self.transmit(&spec, bearer.as_deref()).await?;

        if status != StatusCode::UNAUTHORIZED {
            return finish(status, body);
        }

        // One refresh exchange system-wide; everyone else queues.
        let outcome = match self.gate.begin() {
            RefreshRole::Leader => {
                let outcome = self.refresh_exchange().await;
                self.gate.settle(&outcome);
                if outcome.is_err() {
                    // The session is over: drop both tokens so every
                    // session-aware view resets to anonymous.
                    self.session.clear_tokens().await;
                }
                outcome
            }
            RefreshRole::Waiter(rx) => rx
                .await
                .map_err(|_| ApiError::RefreshFailed("refresh exchange abandoned".to_owned()))?,
        };

        let fresh = outcome?;

        // Replay once with the fresh token; a second 401 is final.
        let (status, body) = self.transmit(&spec, Some(&fresh)).await?;
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized(
                "request rejected again after token refresh".to_owned(),
            ));
        }
        finish(status, body)
    }

    async fn transmit(
        &self,
        spec: &RequestSpec,
        bearer: Option<&str>,
    ) -> Result<(StatusCode, String), ApiError> {
        let mut req = self.http.request(spec.method.clone(), self.url(&spec.path));
        if !spec.query.is_empty() {
            req = req.query(&spec.query);
        }
        if let Some(ref body) = spec.body {
            req = req.json(body);
        }
        if let Some(tok) = bearer {
            req = req.bearer_auth(tok);
        }
        let resp = req.send().await.map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| ApiError::Network(e.to_string()))?;
        Ok((status, body))
    }

    /// Trade the stored refresh token for a new pair and store it.
    /// Fails fast when the refresh token is absent or itself expired.
    async fn refresh_exchange(&self) -> Result<String, ApiError> {
        let refresh = match self.session.refresh_token().await {
            Some(tok) if !token::is_expired(&tok) => tok,
            _ => return Err(ApiError::RefreshFailed("no valid refresh token".to_owned())),
        };

        let resp = self
            .http
            .post(self.url("/auth/refresh-token"))
            .json(&serde_json::json!({ "refresh_token": refresh }))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(%status, "token refresh rejected by backend");
            let message = normalize_error(status.as_u16(), &body).message().to_owned();
            return Err(ApiError::RefreshFailed(message));
        }

        let pair: RefreshResponse =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.session.set_tokens(&pair.access_token, pair.refresh_token.as_deref()).await;
        debug!("token refresh completed, queued requests resuming");
        Ok(pair.access_token)
    }
}

fn finish(status: StatusCode, body: String) -> Result<Value, ApiError> {
    if status.is_success() {
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    } else {
        Err(normalize_error(status.as_u16(), &body))
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
