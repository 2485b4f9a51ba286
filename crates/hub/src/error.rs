// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized client-side error taxonomy.

use std::fmt;

use serde::Deserialize;

/// Fallback message when the backend gives none.
pub const GENERIC_ERROR: &str = "Unknown error occurred";

/// Errors surfaced by the transport and service layers.
///
/// `Clone` so one refresh outcome can be fanned out to every request
/// queued behind the in-flight exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The backend rejected the request's credentials and the one-shot
    /// refresh path could not recover (or was already spent).
    Unauthorized(String),
    /// The refresh exchange itself failed: missing/expired refresh token
    /// or backend rejection. Always followed by a full token clear.
    RefreshFailed(String),
    /// The backend answered with a non-auth error.
    Api { status: u16, message: String },
    /// The request never produced a response.
    Network(String),
    /// The response body did not match the expected shape.
    Decode(String),
}

impl ApiError {
    /// The human-readable message surfaced to calling components.
    pub fn message(&self) -> &str {
        match self {
            Self::Unauthorized(m)
            | Self::RefreshFailed(m)
            | Self::Network(m)
            | Self::Decode(m) => m,
            Self::Api { message, .. } => message,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized(m) => write!(f, "unauthorized: {m}"),
            Self::RefreshFailed(m) => write!(f, "token refresh failed: {m}"),
            Self::Api { status, message } => write!(f, "api error ({status}): {message}"),
            Self::Network(m) => write!(f, "network error: {m}"),
            Self::Decode(m) => write!(f, "unexpected response: {m}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Error body the backend embeds in failed responses.
#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Normalize a failed response into a uniform error: the server-provided
/// `message` when one is present, a generic fallback otherwise.
pub fn normalize_error(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| GENERIC_ERROR.to_owned());
    ApiError::Api { status, message }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
