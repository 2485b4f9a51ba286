// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural bearer-token decoding and expiry math.
//!
//! Decoding splits the compact form and JSON-parses the claims segment.
//! There is no signature verification: the client trusts the issuer
//! implicitly. Anything that consumes claims here must treat them as
//! hints, not as server-validated facts.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::session::epoch_secs;

/// Seconds before the literal expiry at which a token is already treated
/// as expired. Intentional early-refresh margin.
pub const EXPIRY_BUFFER_SECS: u64 = 300;

/// Claims carried in a MangaHub bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_email_verified: bool,
    /// Issued-at, seconds since epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Expiry, seconds since epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// User identity derived from a decoded token. Never persisted;
/// recomputed from the token on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_email_verified: bool,
}

impl From<&TokenClaims> for User {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            id: claims.user_id.clone(),
            email: claims.email.clone(),
            name: claims.name.clone(),
            is_email_verified: claims.is_email_verified,
        }
    }
}

/// Decode a token's claims segment. Returns `None` for anything that is
/// not a well-formed compact token with a JSON claims payload.
pub fn decode(token: &str) -> Option<TokenClaims> {
    let mut parts = token.split('.');
    let _header = parts.next()?;
    let claims_segment = parts.next()?;
    let raw = URL_SAFE_NO_PAD.decode(claims_segment.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&raw).ok()
}

/// Whether a token is expired for client purposes: undecodable, missing
/// an expiry claim, or within [`EXPIRY_BUFFER_SECS`] of its expiry.
/// The boundary is inclusive at exactly `exp - buffer`.
pub fn is_expired(token: &str) -> bool {
    let Some(claims) = decode(token) else {
        return true;
    };
    let Some(exp) = claims.exp else {
        return true;
    };
    exp.saturating_sub(EXPIRY_BUFFER_SECS) <= epoch_secs()
}

/// Whether the token is past its literal expiry, with no early-refresh
/// margin. This is the point where the session is actually over; between
/// `exp - buffer` and `exp` the token still works but wants refreshing.
pub fn is_past_expiry(token: &str) -> bool {
    match expires_at(token) {
        Some(exp) => exp <= epoch_secs(),
        None => true,
    }
}

/// The token's literal expiry in epoch seconds, if it carries one.
pub fn expires_at(token: &str) -> Option<u64> {
    decode(token)?.exp
}

/// Time remaining until the literal expiry, floored at zero.
pub fn time_until_expiry(token: &str) -> Option<Duration> {
    let exp = expires_at(token)?;
    Some(Duration::from_secs(exp.saturating_sub(epoch_secs())))
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
