// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL cache for catalog queries.
//!
//! A hit inside the staleness window returns the cached response without
//! a network call; mutations invalidate by key prefix.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Staleness window for catalog list queries.
pub const LIST_STALE: Duration = Duration::from_secs(5 * 60);
/// Staleness window for search and followed-id queries.
pub const SEARCH_STALE: Duration = Duration::from_secs(2 * 60);
/// Staleness window for the full followed list.
pub const FOLLOWED_STALE: Duration = Duration::from_secs(60);

struct CacheSlot {
    stored_at: Instant,
    value: Value,
}

/// Keyed response cache with per-lookup staleness windows.
#[derive(Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<String, CacheSlot>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a cached response if it is younger than `stale_after`.
    pub fn get(&self, key: &str, stale_after: Duration) -> Option<Value> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|slot| slot.stored_at.elapsed() < stale_after)
            .map(|slot| slot.value.clone())
    }

    pub fn put(&self, key: &str, value: Value) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_owned(), CacheSlot { stored_at: Instant::now(), value });
    }

    /// Drop every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|key, _| !key.starts_with(prefix));
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
