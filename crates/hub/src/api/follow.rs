// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Followed-manga operations over `/follow`.

use std::sync::Arc;

use serde_json::Value;

use crate::api::cache::{QueryCache, FOLLOWED_STALE, SEARCH_STALE};
use crate::api::manga::Manga;
use crate::api::Envelope;
use crate::error::ApiError;
use crate::transport::http::{ApiClient, RequestSpec};

/// Cache key prefix shared by every followed-manga query, so one
/// invalidation covers both the id list and the full list.
const FOLLOW_CACHE_PREFIX: &str = "manga:followed";

pub struct FollowService {
    client: Arc<ApiClient>,
    cache: Arc<QueryCache>,
}

impl FollowService {
    pub fn new(client: Arc<ApiClient>, cache: Arc<QueryCache>) -> Self {
        Self { client, cache }
    }

    /// `GET /follow`: the full followed list.
    pub async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Manga>, ApiError> {
        let key = format!("{FOLLOW_CACHE_PREFIX}:list:{limit}:{offset}");
        if let Some(cached) = self.cache.get(&key, FOLLOWED_STALE) {
            let env: Envelope<Vec<Manga>> =
                serde_json::from_value(cached).map_err(|e| ApiError::Decode(e.to_string()))?;
            return env.into_data();
        }
        let spec = RequestSpec::get("/follow").with_query(vec![
            ("limit".to_owned(), limit.to_string()),
            ("offset".to_owned(), offset.to_string()),
        ]);
        let value: Value = self.client.send(spec).await?;
        self.cache.put(&key, value.clone());
        let env: Envelope<Vec<Manga>> =
            serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;
        env.into_data()
    }

    /// `GET /follow/ids`: lightweight id list for membership checks.
    pub async fn ids(&self) -> Result<Vec<String>, ApiError> {
        let key = format!("{FOLLOW_CACHE_PREFIX}:ids");
        if let Some(cached) = self.cache.get(&key, SEARCH_STALE) {
            let env: Envelope<Vec<String>> =
                serde_json::from_value(cached).map_err(|e| ApiError::Decode(e.to_string()))?;
            return env.into_data();
        }
        let value: Value = self.client.send(RequestSpec::get("/follow/ids")).await?;
        self.cache.put(&key, value.clone());
        let env: Envelope<Vec<String>> =
            serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;
        env.into_data()
    }

    /// `POST /follow`: start following; drops the followed caches.
    pub async fn follow(&self, manga_id: &str) -> Result<(), ApiError> {
        let env: Envelope<Value> = self
            .client
            .send(RequestSpec::post("/follow", serde_json::json!({ "mangaId": manga_id })))
            .await?;
        env.ensure_success()?;
        self.cache.invalidate_prefix(FOLLOW_CACHE_PREFIX);
        Ok(())
    }

    /// `DELETE /follow/:id`: stop following; drops the followed caches.
    pub async fn unfollow(&self, manga_id: &str) -> Result<(), ApiError> {
        let env: Envelope<Value> =
            self.client.send(RequestSpec::delete(format!("/follow/{manga_id}"))).await?;
        env.ensure_success()?;
        self.cache.invalidate_prefix(FOLLOW_CACHE_PREFIX);
        Ok(())
    }
}

#[cfg(test)]
#[path = "follow_tests.rs"]
mod tests;
