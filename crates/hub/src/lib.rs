// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mangahub: MangaHub API client with a session/token lifecycle core.

pub mod api;
pub mod config;
pub mod error;
pub mod search;
pub mod session;
pub mod store;
pub mod test_support;
pub mod transport;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::api::auth::AuthService;
use crate::api::cache::QueryCache;
use crate::api::follow::FollowService;
use crate::api::manga::MangaService;
use crate::api::oauth::OAuthService;
use crate::config::HubConfig;
use crate::session::manager::SessionManager;
use crate::store::AuthStore;
use crate::transport::http::ApiClient;

/// Wired-up client: one session, one transport, all services.
pub struct Hub {
    pub session: Arc<SessionManager>,
    pub client: Arc<ApiClient>,
    pub cache: Arc<QueryCache>,
    pub auth: Arc<AuthService>,
    pub manga: Arc<MangaService>,
    pub follow: Arc<FollowService>,
    pub oauth: OAuthService,
    pub store: Arc<AuthStore>,
}

impl Hub {
    pub fn new(config: &HubConfig) -> Self {
        Self::with_state_path(
            &config.api_url,
            Some(config.cookie_jar_path()),
            config.production,
            config.http_timeout(),
        )
    }

    /// Build against an explicit jar path (`None` keeps the session in
    /// memory; used by tests and embedded callers).
    pub fn with_state_path(
        api_url: &str,
        jar_path: Option<PathBuf>,
        production: bool,
        timeout: Duration,
    ) -> Self {
        let session = Arc::new(SessionManager::new(jar_path, production));
        let client = Arc::new(ApiClient::new(api_url, Arc::clone(&session), timeout));
        let cache = Arc::new(QueryCache::new());
        let auth = Arc::new(AuthService::new(Arc::clone(&client)));
        let manga = Arc::new(MangaService::new(Arc::clone(&client), Arc::clone(&cache)));
        let follow = Arc::new(FollowService::new(Arc::clone(&client), Arc::clone(&cache)));
        let oauth = OAuthService::new(api_url, Arc::clone(&session), timeout);
        let store = Arc::new(AuthStore::new(Arc::clone(&session)));
        Self { session, client, cache, auth, manga, follow, oauth, store }
    }
}
