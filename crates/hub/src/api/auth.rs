// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Account operations: registration, login, logout, verification, and the
//! proactive refresh used by the monitor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::api::Envelope;
use crate::error::ApiError;
use crate::session::manager::SessionManager;
use crate::session::token::{self, User};
use crate::transport::http::{ApiClient, RequestSpec};

#[derive(Debug, Clone, Serialize)]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

/// Token pair returned by the login and refresh endpoints (not enveloped).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

pub struct AuthService {
    client: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    fn session(&self) -> &Arc<SessionManager> {
        self.client.session()
    }

    /// `POST /auth/register`.
    pub async fn register(&self, payload: &RegisterPayload) -> Result<(), ApiError> {
        let body = serde_json::to_value(payload).map_err(|e| ApiError::Decode(e.to_string()))?;
        let env: Envelope<Value> =
            self.client.send(RequestSpec::post("/auth/register", body)).await?;
        env.ensure_success()
    }

    /// `POST /auth/login`: stores the returned token pair on success.
    pub async fn login(&self, payload: &LoginPayload) -> Result<Option<User>, ApiError> {
        let body = serde_json::to_value(payload).map_err(|e| ApiError::Decode(e.to_string()))?;
        let pair: TokenPairResponse =
            self.client.send(RequestSpec::post("/auth/login", body)).await?;
        self.session().set_tokens(&pair.access_token, pair.refresh_token.as_deref()).await;
        info!("signed in");
        Ok(self.session().user_from_token().await)
    }

    /// `POST /auth/logout`: best-effort; local tokens are always cleared.
    pub async fn logout(&self) {
        if let Err(e) = self
            .client
            .send::<Value>(RequestSpec::post("/auth/logout", serde_json::json!({})))
            .await
        {
            warn!(err = %e, "logout call failed");
        }
        self.session().clear_tokens().await;
        info!("signed out");
    }

    /// Proactive refresh: validate the stored refresh token, exchange it,
    /// store the new pair. Any failure clears the session.
    pub async fn refresh_tokens(&self) -> Result<String, ApiError> {
        let result = self.try_refresh().await;
        if result.is_err() {
            self.session().clear_tokens().await;
        }
        result
    }

    async fn try_refresh(&self) -> Result<String, ApiError> {
        let refresh = match self.session().refresh_token().await {
            Some(tok) if !token::is_expired(&tok) => tok,
            _ => return Err(ApiError::RefreshFailed("no valid refresh token".to_owned())),
        };
        let pair: TokenPairResponse = self
            .client
            .send(RequestSpec::post(
                "/auth/refresh-token",
                serde_json::json!({ "refresh_token": refresh }),
            ))
            .await?;
        self.session().set_tokens(&pair.access_token, pair.refresh_token.as_deref()).await;
        Ok(pair.access_token)
    }

    /// `POST /auth/verify-email`.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<(), ApiError> {
        let env: Envelope<Value> = self
            .client
            .send(RequestSpec::post(
                "/auth/verify-email",
                serde_json::json!({ "email": email, "verificationCode": code }),
            ))
            .await?;
        env.ensure_success()
    }

    /// `POST /auth/resend-verification`.
    pub async fn resend_verification(&self, email: &str) -> Result<(), ApiError> {
        let env: Envelope<Value> = self
            .client
            .send(RequestSpec::post(
                "/auth/resend-verification",
                serde_json::json!({ "email": email }),
            ))
            .await?;
        env.ensure_success()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session().user_from_token().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session().is_access_token_valid().await
    }

    pub async fn should_refresh(&self) -> bool {
        self.session().should_refresh().await
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
