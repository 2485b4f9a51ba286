// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth hand-off: provider redirect URLs and callback adoption.
//!
//! Sign-in happens in a browser; the callback lands back here carrying a
//! `token` or `error` query parameter, which is consumed exactly once.
//! This service talks to the backend directly (not through the
//! interceptor) because the callback token is not in the session yet.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::api::Envelope;
use crate::error::{normalize_error, ApiError};
use crate::session::cookie::percent_decode;
use crate::session::manager::SessionManager;
use crate::session::token::{self, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Facebook,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "facebook" => Ok(Self::Facebook),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Result of parsing a callback URL. When the provider reported an
/// error, `token` is absent (error wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackOutcome {
    pub token: Option<String>,
    pub error: Option<String>,
}

/// User payload from `GET /api/v1/auth/me`.
#[derive(Debug, Clone, Deserialize)]
struct MeResponse {
    #[serde(flatten)]
    user: User,
}

pub struct OAuthService {
    base_url: String,
    http: reqwest::Client,
    session: Arc<SessionManager>,
}

impl OAuthService {
    pub fn new(base_url: &str, session: Arc<SessionManager>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder().timeout(timeout).build().unwrap_or_default();
        Self { base_url: base_url.trim_end_matches('/').to_owned(), http, session }
    }

    /// Full-page navigation target for a provider sign-in.
    pub fn authorize_url(&self, provider: OAuthProvider) -> String {
        format!("{}/api/v1/auth/{}", self.base_url, provider.as_str())
    }

    /// Whether a URL looks like an OAuth callback.
    pub fn is_callback(url: &str) -> bool {
        let Some((_, query)) = url.split_once('?') else {
            return false;
        };
        query.split('&').any(|pair| {
            let key = pair.split_once('=').map(|(k, _)| k).unwrap_or(pair);
            key == "token" || key == "error"
        })
    }

    /// Parse `token`/`error` out of a callback URL. The parameters are
    /// consumed: the returned string is the URL with its query stripped.
    pub fn parse_callback(url: &str) -> (CallbackOutcome, String) {
        let (clean, query) = match url.split_once('?') {
            Some((base, query)) => (base.to_owned(), query),
            None => return (CallbackOutcome::default(), url.to_owned()),
        };

        let mut token = None;
        let mut error = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("token", value)) if !value.is_empty() => token = Some(value.to_owned()),
                Some(("error", value)) if !value.is_empty() => {
                    error = Some(percent_decode(value));
                }
                _ => {}
            }
        }

        if error.is_some() {
            return (CallbackOutcome { token: None, error }, clean);
        }
        (CallbackOutcome { token, error: None }, clean)
    }

    /// Adopt a callback token: park it in the short-lived hand-off cookie,
    /// confirm it against the backend, then promote it to the session.
    pub async fn complete(&self, callback_token: &str) -> Result<User, ApiError> {
        if token::is_expired(callback_token) {
            return Err(ApiError::Unauthorized("callback token already expired".to_owned()));
        }
        self.session.set_oauth_handoff(callback_token).await;

        let user = self.user_info(callback_token).await?;

        let handoff = self.session.take_oauth_handoff().await;
        let adopted = handoff.as_deref().unwrap_or(callback_token);
        self.session.set_access_token(adopted).await;
        info!(user = %user.email, "oauth sign-in completed");
        Ok(user)
    }

    /// `GET /api/v1/auth/me` with an explicit bearer token.
    pub async fn user_info(&self, bearer: &str) -> Result<User, ApiError> {
        let resp = self
            .http
            .get(format!("{}/api/v1/auth/me", self.base_url))
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| ApiError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(normalize_error(status.as_u16(), &body));
        }
        let env: Envelope<MeResponse> =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(env.into_data()?.user)
    }
}

#[cfg(test)]
#[path = "oauth_tests.rs"]
mod tests;
