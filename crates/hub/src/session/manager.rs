// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session manager: owns the token pair and the facts derived from it.
//!
//! All state-reading methods swallow decode failures: a malformed token
//! reads as "no valid session", never as an error. Every mutation
//! broadcasts a [`TokenEvent`] so other session-aware components (the
//! state store, the refresh monitor, watchers in other processes' place)
//! resynchronize.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::session::cookie::{CookieJar, CookieOptions};
use crate::session::token::{self, TokenClaims, User};
use crate::session::{
    TokenEvent, ACCESS_TOKEN_COOKIE, ACCESS_TOKEN_TTL_MINUTES, OAUTH_TOKEN_COOKIE,
    OAUTH_TOKEN_TTL_MINUTES, REFRESH_TOKEN_COOKIE, REFRESH_TOKEN_TTL_MINUTES,
};

/// Composite authentication state derived from the stored tokens.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub token: Option<String>,
}

/// Diagnostic summary of both stored tokens.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub access_token_expired: bool,
    pub refresh_token_expired: bool,
    pub access_claims: Option<TokenClaims>,
    pub refresh_claims: Option<TokenClaims>,
}

pub struct SessionManager {
    jar: RwLock<CookieJar>,
    production: bool,
    event_tx: broadcast::Sender<TokenEvent>,
}

impl SessionManager {
    /// Create a manager over a file-backed jar, or an in-memory one when
    /// `jar_path` is `None`.
    pub fn new(jar_path: Option<PathBuf>, production: bool) -> Self {
        let jar = match jar_path {
            Some(path) => CookieJar::open(path),
            None => CookieJar::detached(),
        };
        let (event_tx, _) = broadcast::channel(16);
        Self { jar: RwLock::new(jar), production, event_tx }
    }

    /// Subscribe to token change events.
    pub fn subscribe(&self) -> broadcast::Receiver<TokenEvent> {
        self.event_tx.subscribe()
    }

    fn options(&self) -> CookieOptions {
        CookieOptions::defaults(self.production)
    }

    /// Read one cookie, picking up writes from other processes first.
    async fn read_cookie(&self, name: &str) -> Option<String> {
        let mut jar = self.jar.write().await;
        jar.reload();
        jar.get(name)
    }

    pub async fn access_token(&self) -> Option<String> {
        self.read_cookie(ACCESS_TOKEN_COOKIE).await
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.read_cookie(REFRESH_TOKEN_COOKIE).await
    }

    pub async fn set_access_token(&self, token: &str) {
        let options = self.options();
        self.jar.write().await.set(ACCESS_TOKEN_COOKIE, token, ACCESS_TOKEN_TTL_MINUTES, options);
        let _ = self.event_tx.send(TokenEvent::Changed);
    }

    pub async fn set_refresh_token(&self, token: &str) {
        let options = self.options();
        self.jar.write().await.set(REFRESH_TOKEN_COOKIE, token, REFRESH_TOKEN_TTL_MINUTES, options);
        let _ = self.event_tx.send(TokenEvent::Changed);
    }

    /// Store both tokens; the refresh token only when the issuer rotated it.
    pub async fn set_tokens(&self, access_token: &str, refresh_token: Option<&str>) {
        {
            let mut jar = self.jar.write().await;
            jar.set(ACCESS_TOKEN_COOKIE, access_token, ACCESS_TOKEN_TTL_MINUTES, self.options());
            if let Some(refresh) = refresh_token {
                jar.set(REFRESH_TOKEN_COOKIE, refresh, REFRESH_TOKEN_TTL_MINUTES, self.options());
            }
        }
        let _ = self.event_tx.send(TokenEvent::Changed);
    }

    /// Remove both tokens.
    pub async fn clear_tokens(&self) {
        {
            let mut jar = self.jar.write().await;
            jar.remove(ACCESS_TOKEN_COOKIE);
            jar.remove(REFRESH_TOKEN_COOKIE);
        }
        let _ = self.event_tx.send(TokenEvent::Cleared);
    }

    /// Park a token from the OAuth/verification hand-off.
    pub async fn set_oauth_handoff(&self, token: &str) {
        let options = self.options();
        self.jar.write().await.set(OAUTH_TOKEN_COOKIE, token, OAUTH_TOKEN_TTL_MINUTES, options);
        let _ = self.event_tx.send(TokenEvent::Changed);
    }

    /// Consume the hand-off token, removing it from the jar.
    pub async fn take_oauth_handoff(&self) -> Option<String> {
        let mut jar = self.jar.write().await;
        jar.reload();
        let token = jar.get(OAUTH_TOKEN_COOKIE);
        if token.is_some() {
            jar.remove(OAUTH_TOKEN_COOKIE);
        }
        token
    }

    pub async fn is_access_token_valid(&self) -> bool {
        match self.access_token().await {
            Some(token) => !token::is_expired(&token),
            None => false,
        }
    }

    pub async fn is_refresh_token_valid(&self) -> bool {
        match self.refresh_token().await {
            Some(token) => !token::is_expired(&token),
            None => false,
        }
    }

    /// Whether the access token is inside the early-refresh window:
    /// less than the buffer away from its literal expiry, or carrying no
    /// readable expiry at all.
    pub async fn should_refresh(&self) -> bool {
        let Some(token) = self.access_token().await else {
            return false;
        };
        match token::time_until_expiry(&token) {
            Some(remaining) => remaining < Duration::from_secs(token::EXPIRY_BUFFER_SECS),
            None => true,
        }
    }

    /// The user encoded in the access token, or `None` when the token is
    /// missing, past its literal expiry, or undecodable.
    pub async fn user_from_token(&self) -> Option<User> {
        let token = self.access_token().await?;
        if token::is_past_expiry(&token) {
            return None;
        }
        token::decode(&token).map(|claims| User::from(&claims))
    }

    /// Composite authentication state.
    ///
    /// When the stored access token is past its literal expiry, both
    /// token cookies are cleared as a side effect; any use after expiry
    /// resets the session. A token inside the early-refresh margin still
    /// reads as authenticated; the monitor refreshes it rather than
    /// dropping a session that is about to be renewed.
    pub async fn auth_state(&self) -> AuthState {
        let Some(token) = self.access_token().await else {
            return AuthState::default();
        };
        if token::is_past_expiry(&token) {
            debug!("access token expired on read, clearing session");
            self.clear_tokens().await;
            return AuthState::default();
        }
        let user = token::decode(&token).map(|claims| User::from(&claims));
        AuthState { is_authenticated: true, user, token: Some(token) }
    }

    /// Diagnostic summary of both tokens.
    pub async fn token_info(&self) -> TokenInfo {
        let access = self.access_token().await;
        let refresh = self.refresh_token().await;
        TokenInfo {
            has_access_token: access.is_some(),
            has_refresh_token: refresh.is_some(),
            access_token_expired: access.as_deref().map(token::is_expired).unwrap_or(true),
            refresh_token_expired: refresh.as_deref().map(token::is_expired).unwrap_or(true),
            access_claims: access.as_deref().and_then(token::decode),
            refresh_claims: refresh.as_deref().and_then(token::decode),
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
