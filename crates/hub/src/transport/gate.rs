// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-slot coordinator for the token refresh exchange.
//!
//! Invariant: at most one refresh exchange is in flight at a time. A
//! request that observes an authorization failure while the slot is taken
//! enqueues here instead of starting its own exchange; the queue drains
//! exactly once, when the in-flight exchange settles.

use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::error::ApiError;

/// Outcome distributed to queued waiters: the fresh access token, or the
/// refresh error they all share.
pub type RefreshOutcome = Result<String, ApiError>;

/// Role assigned to a request that hit an authorization failure.
pub enum RefreshRole {
    /// This request claimed the slot and must run the exchange.
    Leader,
    /// An exchange is already in flight; await its outcome.
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

#[derive(Default)]
struct GateState {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// The coordinator object owning the in-flight flag and the waiter list.
#[derive(Default)]
pub struct RefreshGate {
    inner: Mutex<GateState>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the refresh slot, or join the queue behind the current holder.
    /// The check-and-set is atomic under the lock, so two callers can
    /// never both become leader.
    pub fn begin(&self) -> RefreshRole {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            RefreshRole::Waiter(rx)
        } else {
            state.refreshing = true;
            RefreshRole::Leader
        }
    }

    /// Settle the in-flight exchange: release the slot and resolve every
    /// queued waiter with the outcome.
    pub fn settle(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };
        for tx in waiters {
            let _ = tx.send(outcome.clone());
        }
    }

    /// Whether an exchange is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).refreshing
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
