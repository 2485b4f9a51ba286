// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle: cookie-backed token storage with change broadcasting.
//!
//! The session core owns the access/refresh token pair, decodes bearer
//! tokens structurally, and broadcasts a typed [`TokenEvent`] on every
//! mutation so independent session-aware components resynchronize without
//! a shared-memory channel.

pub mod cookie;
pub mod manager;
pub mod token;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Cookie name for the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
/// Cookie name for the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
/// Short-lived cookie holding a token handed off by the OAuth callback or
/// the email verification flow, before it is promoted to the session.
pub const OAUTH_TOKEN_COOKIE: &str = "accessToken";

/// Access token cookie lifetime: 24 hours.
pub const ACCESS_TOKEN_TTL_MINUTES: u64 = 60 * 24;
/// Refresh token cookie lifetime: 7 days.
pub const REFRESH_TOKEN_TTL_MINUTES: u64 = 60 * 24 * 7;
/// OAuth hand-off cookie lifetime: 15 minutes.
pub const OAUTH_TOKEN_TTL_MINUTES: u64 = 15;

/// Signal broadcast on every token mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenEvent {
    /// Tokens were stored or replaced.
    Changed,
    /// Tokens were removed; the session is over.
    Cleared,
}

/// Resolve the state directory for mangahub data.
///
/// Checks `MANGAHUB_STATE_DIR`, then `$XDG_STATE_HOME/mangahub`,
/// then `$HOME/.local/state/mangahub`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MANGAHUB_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("mangahub");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/mangahub");
    }
    PathBuf::from(".mangahub")
}

pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
