// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debounced search suggestions.
//!
//! Keystrokes are coalesced into at most one suggestion fetch per
//! debounce window; a newer keystroke aborts the pending fetch. Fetch
//! failures clear the suggestion list silently.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::ApiError;

/// Debounce window between the last keystroke and the suggestion fetch.
pub const SUGGESTION_DEBOUNCE: Duration = Duration::from_millis(300);
/// Minimum query length before suggestions are fetched.
pub const MIN_QUERY_LEN: usize = 2;
/// Number of suggestions fetched per query.
pub const SUGGESTION_LIMIT: u32 = 5;

/// A single type-ahead suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub cover_url: Option<String>,
}

type SuggestionFuture = Pin<Box<dyn Future<Output = Result<Vec<Suggestion>, ApiError>> + Send>>;

/// Fetch function, injected so tests can observe call timing without a
/// live backend.
pub type SuggestionFetch = Arc<dyn Fn(String) -> SuggestionFuture + Send + Sync>;

pub struct SuggestionDebouncer {
    fetch: SuggestionFetch,
    tx: mpsc::UnboundedSender<Vec<Suggestion>>,
    window: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SuggestionDebouncer {
    pub fn new(fetch: SuggestionFetch, tx: mpsc::UnboundedSender<Vec<Suggestion>>) -> Self {
        Self::with_window(fetch, tx, SUGGESTION_DEBOUNCE)
    }

    pub fn with_window(
        fetch: SuggestionFetch,
        tx: mpsc::UnboundedSender<Vec<Suggestion>>,
        window: Duration,
    ) -> Self {
        Self { fetch, tx, window, pending: Mutex::new(None) }
    }

    /// Build a debouncer over the catalog search endpoint.
    pub fn for_catalog(
        manga: Arc<crate::api::manga::MangaService>,
        tx: mpsc::UnboundedSender<Vec<Suggestion>>,
    ) -> Self {
        let fetch: SuggestionFetch = Arc::new(move |query| {
            let manga = Arc::clone(&manga);
            Box::pin(async move { manga.suggestions(&query).await })
        });
        Self::new(fetch, tx)
    }

    /// Feed the current query text. Supersedes any pending fetch.
    pub fn input(&self, query: &str) {
        self.cancel();

        let trimmed = query.trim().to_owned();
        if trimmed.chars().count() < MIN_QUERY_LEN {
            let _ = self.tx.send(Vec::new());
            return;
        }

        let fetch = Arc::clone(&self.fetch);
        let tx = self.tx.clone();
        let window = self.window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            match fetch(trimmed.clone()).await {
                Ok(suggestions) => {
                    let _ = tx.send(suggestions);
                }
                Err(e) => {
                    debug!(query = %trimmed, err = %e, "suggestion fetch failed");
                    let _ = tx.send(Vec::new());
                }
            }
        });
        *self.pending.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Abort the pending fetch, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

impl Drop for SuggestionDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
