// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog operations over `/manga`, cached per the staleness contract.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::api::cache::{QueryCache, LIST_STALE, SEARCH_STALE};
use crate::api::Envelope;
use crate::error::ApiError;
use crate::search::Suggestion;
use crate::transport::http::{ApiClient, RequestSpec};

/// A catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manga {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Chapter number as the backend prints it ("12", "12.5").
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MangaDetail {
    #[serde(flatten)]
    pub manga: Manga,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterImages {
    #[serde(default)]
    pub images: Vec<String>,
}

/// One page of catalog results.
#[derive(Debug, Clone)]
pub struct MangaPage {
    pub items: Vec<Manga>,
    pub total: u64,
}

/// Parameters for catalog list and search queries.
#[derive(Debug, Clone, Serialize)]
pub struct ListParams {
    pub limit: u32,
    pub offset: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self { limit: 25, offset: 0, order: None, status: Vec::new(), tags: Vec::new() }
    }
}

impl ListParams {
    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            ("limit".to_owned(), self.limit.to_string()),
            ("offset".to_owned(), self.offset.to_string()),
        ];
        if let Some(ref order) = self.order {
            query.push(("order".to_owned(), order.clone()));
        }
        if !self.status.is_empty() {
            query.push(("status".to_owned(), self.status.join(",")));
        }
        if !self.tags.is_empty() {
            query.push(("tags".to_owned(), self.tags.join(",")));
        }
        query
    }

    /// Canonical key suffix so identical parameters share a cache slot.
    fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub struct MangaService {
    client: Arc<ApiClient>,
    cache: Arc<QueryCache>,
}

impl MangaService {
    pub fn new(client: Arc<ApiClient>, cache: Arc<QueryCache>) -> Self {
        Self { client, cache }
    }

    /// `GET /manga`: paginated catalog listing.
    pub async fn list(&self, params: &ListParams) -> Result<MangaPage, ApiError> {
        let key = format!("manga:list:{}", params.cache_key());
        let spec = RequestSpec::get("/manga").with_query(params.to_query());
        self.page_cached(&key, LIST_STALE, spec).await
    }

    /// `GET /manga/search`: title search with the same pagination.
    pub async fn search(&self, query_text: &str, params: &ListParams) -> Result<MangaPage, ApiError> {
        let key = format!("manga:search:{query_text}:{}", params.cache_key());
        let mut query = params.to_query();
        query.push(("q".to_owned(), query_text.to_owned()));
        let spec = RequestSpec::get("/manga/search").with_query(query);
        self.page_cached(&key, SEARCH_STALE, spec).await
    }

    /// `GET /manga/:id`: a single catalog entry.
    pub async fn by_id(&self, id: &str) -> Result<Manga, ApiError> {
        let env: Envelope<Manga> = self.client.send(RequestSpec::get(format!("/manga/{id}"))).await?;
        env.into_data()
    }

    /// `GET /manga/:id/detail`: entry with description and chapter list.
    pub async fn detail(&self, id: &str) -> Result<MangaDetail, ApiError> {
        let env: Envelope<MangaDetail> =
            self.client.send(RequestSpec::get(format!("/manga/{id}/detail"))).await?;
        env.into_data()
    }

    /// `GET /manga/chapter/:id/images`: page image URLs for a chapter.
    pub async fn chapter_images(&self, chapter_id: &str) -> Result<Vec<String>, ApiError> {
        let env: Envelope<ChapterImages> = self
            .client
            .send(RequestSpec::get(format!("/manga/chapter/{chapter_id}/images")))
            .await?;
        Ok(env.into_data()?.images)
    }

    /// Small search used for type-ahead suggestions.
    pub async fn suggestions(&self, query_text: &str) -> Result<Vec<Suggestion>, ApiError> {
        let params =
            ListParams { limit: crate::search::SUGGESTION_LIMIT, ..ListParams::default() };
        let page = self.search(query_text, &params).await?;
        Ok(page
            .items
            .into_iter()
            .map(|m| Suggestion {
                id: m.id,
                title: m.title,
                author: m.author,
                cover_url: m.cover_url,
            })
            .collect())
    }

    async fn page_cached(
        &self,
        key: &str,
        stale_after: std::time::Duration,
        spec: RequestSpec,
    ) -> Result<MangaPage, ApiError> {
        if let Some(cached) = self.cache.get(key, stale_after) {
            debug!(key, "catalog cache hit");
            return decode_page(cached);
        }
        let value: Value = self.client.send(spec).await?;
        self.cache.put(key, value.clone());
        decode_page(value)
    }
}

fn decode_page(value: Value) -> Result<MangaPage, ApiError> {
    let env: Envelope<Vec<Manga>> =
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;
    let pagination = env.pagination;
    let items = env.into_data()?;
    let total = pagination.map(|p| p.total).unwrap_or(items.len() as u64);
    Ok(MangaPage { items, total })
}

#[cfg(test)]
#[path = "manga_tests.rs"]
mod tests;
