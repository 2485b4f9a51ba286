// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background task keeping the stored token fresh.
//!
//! Deliberately multi-triggered (interval, token events, and explicit
//! wakes) so no single timer is load-bearing for staleness. An expired
//! token resets the session; a token inside the early-refresh window is
//! exchanged proactively before any request can fail on it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::auth::AuthService;
use crate::session::TokenEvent;
use crate::store::AuthStore;

pub struct RefreshMonitor {
    store: Arc<AuthStore>,
    auth: Arc<AuthService>,
    interval: Duration,
    wake: Arc<Notify>,
}

impl RefreshMonitor {
    pub fn new(store: Arc<AuthStore>, auth: Arc<AuthService>, interval: Duration) -> Self {
        Self { store, auth, interval, wake: Arc::new(Notify::new()) }
    }

    /// Handle used to force an immediate re-check: the analog of a tab
    /// regaining focus or becoming visible.
    pub fn waker(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    /// Run until the shutdown token is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(shutdown).await;
        })
    }

    async fn run(self, shutdown: CancellationToken) {
        let mut events = self.store.session().subscribe();
        self.tick("startup").await;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    self.tick("interval").await;
                }
                _ = self.wake.notified() => {
                    self.tick("wake").await;
                }
                event = events.recv() => match event {
                    Ok(TokenEvent::Changed) => {
                        self.store.initialize().await;
                    }
                    Ok(TokenEvent::Cleared) => {
                        self.store.reset(None).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "token event stream lagged, resyncing");
                        self.store.initialize().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("token event channel closed");
                        return;
                    }
                },
                _ = shutdown.cancelled() => {
                    info!("refresh monitor stopped");
                    return;
                }
            }
        }
    }

    /// One check. Refresh comes before any clearing: a token inside the
    /// early-refresh window must be exchanged while it is still usable.
    async fn tick(&self, trigger: &str) {
        let session = self.store.session();

        if session.should_refresh().await {
            if session.is_refresh_token_valid().await {
                match self.auth.refresh_tokens().await {
                    Ok(access_token) => {
                        self.store.apply_refresh(&access_token).await;
                        info!(trigger, "access token refreshed");
                    }
                    Err(e) => {
                        warn!(trigger, err = %e, "proactive refresh failed");
                        self.store.reset(Some(e.message().to_owned())).await;
                    }
                }
                return;
            }
            // No usable refresh token: the session ends when the token does.
            if self.store.check_expiration().await {
                debug!(trigger, "session expired, cleared");
                return;
            }
            let state = session.auth_state().await;
            if !state.is_authenticated {
                self.store.reset(None).await;
            }
            return;
        }

        if self.store.check_expiration().await {
            debug!(trigger, "session expired, cleared");
            return;
        }
        self.store.initialize().await;
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
