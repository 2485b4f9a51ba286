// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application state: the denormalized session view and its monitor.

pub mod monitor;

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::ApiError;
use crate::session::manager::SessionManager;
use crate::session::token::{self, User};

/// Snapshot of the session as consumed by front-end surfaces.
#[derive(Debug, Clone, Default)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Shared, mutable view of the session. Synchronized from the session
/// manager on bootstrap, on the monitor's timer, and on token events;
/// the session manager stays the source of truth.
pub struct AuthStore {
    session: Arc<SessionManager>,
    state: RwLock<AuthSnapshot>,
}

impl AuthStore {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session, state: RwLock::new(AuthSnapshot::default()) }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Read the session into the store (bootstrap and resync path).
    pub async fn initialize(&self) -> AuthSnapshot {
        let auth = self.session.auth_state().await;
        let snapshot = AuthSnapshot {
            user: auth.user,
            token: auth.token,
            is_authenticated: auth.is_authenticated,
            is_loading: false,
            error: None,
        };
        *self.state.write().await = snapshot.clone();
        snapshot
    }

    pub async fn snapshot(&self) -> AuthSnapshot {
        self.state.read().await.clone()
    }

    /// Adopt a freshly issued token (login or OAuth callback).
    pub async fn login_with_token(&self, access_token: &str) -> Result<User, ApiError> {
        if token::is_expired(access_token) {
            let err = ApiError::Unauthorized("token has expired".to_owned());
            self.reset(Some(err.message().to_owned())).await;
            return Err(err);
        }
        let Some(claims) = token::decode(access_token) else {
            let err = ApiError::Unauthorized("invalid token".to_owned());
            self.reset(Some(err.message().to_owned())).await;
            return Err(err);
        };
        let user = User::from(&claims);

        self.session.set_access_token(access_token).await;
        *self.state.write().await = AuthSnapshot {
            user: Some(user.clone()),
            token: Some(access_token.to_owned()),
            is_authenticated: true,
            is_loading: false,
            error: None,
        };
        Ok(user)
    }

    /// Mirror a completed refresh exchange into the store.
    pub async fn apply_refresh(&self, access_token: &str) {
        let user = token::decode(access_token).map(|c| User::from(&c));
        *self.state.write().await = AuthSnapshot {
            user,
            token: Some(access_token.to_owned()),
            is_authenticated: true,
            is_loading: false,
            error: None,
        };
    }

    /// Reset to anonymous (logout, refresh failure, expiry).
    pub async fn reset(&self, error: Option<String>) {
        *self.state.write().await = AuthSnapshot { error, ..AuthSnapshot::default() };
    }

    /// Drop the in-memory session if the mirrored token has expired, and
    /// clear the cookies behind it, unless a newer token was written there
    /// in the meantime (another process may have refreshed already).
    /// Returns true when state was reset.
    pub async fn check_expiration(&self) -> bool {
        let mirrored = self.state.read().await.token.clone();
        let Some(mirrored) = mirrored else {
            return false;
        };
        if !token::is_expired(&mirrored) {
            return false;
        }
        debug!("mirrored token expired, resetting store");
        self.reset(None).await;

        let still_current = match self.session.access_token().await {
            Some(current) => current == mirrored || token::is_expired(&current),
            None => false,
        };
        if still_current {
            self.session.clear_tokens().await;
        }
        true
    }

    pub async fn set_loading(&self, loading: bool) {
        self.state.write().await.is_loading = loading;
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
