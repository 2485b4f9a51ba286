// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode as AxStatus};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use super::*;
use crate::test_support::token_expiring_in;

fn service(base: &str) -> OAuthService {
    crate::test_support::ensure_crypto();
    let session = Arc::new(SessionManager::new(None, false));
    OAuthService::new(base, session, Duration::from_secs(5))
}

#[test]
fn authorize_url_targets_the_provider_route() {
    let svc = service("https://api.example.com/");
    assert_eq!(
        svc.authorize_url(OAuthProvider::Google),
        "https://api.example.com/api/v1/auth/google"
    );
    assert_eq!(
        svc.authorize_url(OAuthProvider::Facebook),
        "https://api.example.com/api/v1/auth/facebook"
    );
}

#[test]
fn parse_callback_extracts_the_token_and_strips_the_query() {
    let (outcome, clean) =
        OAuthService::parse_callback("https://app.example.com/callback?token=abc123&state=x");
    assert_eq!(outcome, CallbackOutcome { token: Some("abc123".to_owned()), error: None });
    assert_eq!(clean, "https://app.example.com/callback");
}

#[test]
fn parse_callback_decodes_the_error() {
    let (outcome, _) = OAuthService::parse_callback(
        "https://app.example.com/callback?error=access%20denied",
    );
    assert_eq!(outcome.error.as_deref(), Some("access denied"));
    assert_eq!(outcome.token, None);
}

#[test]
fn parse_callback_error_wins_over_token() {
    let (outcome, _) =
        OAuthService::parse_callback("https://x/cb?token=abc&error=denied");
    assert_eq!(outcome.token, None);
    assert_eq!(outcome.error.as_deref(), Some("denied"));
}

#[test]
fn parse_callback_without_query_is_empty() {
    let (outcome, clean) = OAuthService::parse_callback("https://x/cb");
    assert_eq!(outcome, CallbackOutcome::default());
    assert_eq!(clean, "https://x/cb");
}

#[test]
fn is_callback_detects_token_or_error() {
    assert!(OAuthService::is_callback("https://x/cb?token=a"));
    assert!(OAuthService::is_callback("https://x/cb?error=denied"));
    assert!(!OAuthService::is_callback("https://x/cb?state=only"));
    assert!(!OAuthService::is_callback("https://x/cb"));
}

async fn spawn_me_endpoint(expected_bearer: String) -> std::net::SocketAddr {
    let me = get(move |headers: HeaderMap| {
        let expected = expected_bearer.clone();
        async move {
            let bearer = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_owned);
            if bearer.as_deref() == Some(expected.as_str()) {
                let body = serde_json::json!({
                    "success": true,
                    "data": {
                        "id": "u1",
                        "email": "a@b.com",
                        "name": "A",
                        "isEmailVerified": true
                    }
                })
                .to_string();
                (AxStatus::OK, body)
            } else {
                (AxStatus::UNAUTHORIZED, r#"{"message":"bad token"}"#.to_owned())
            }
        }
    });

    let app = Router::new().route("/api/v1/auth/me", me);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}

#[tokio::test]
async fn complete_adopts_the_callback_token() {
    let callback_token = token_expiring_in(86400);
    let addr = spawn_me_endpoint(callback_token.clone()).await;

    crate::test_support::ensure_crypto();
    let session = Arc::new(SessionManager::new(None, false));
    let svc =
        OAuthService::new(&format!("http://{addr}"), Arc::clone(&session), Duration::from_secs(5));

    let user = svc.complete(&callback_token).await.unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(user.email, "a@b.com");

    // The token moved from the hand-off cookie into the session proper.
    assert_eq!(session.access_token().await.as_deref(), Some(callback_token.as_str()));
    assert_eq!(session.take_oauth_handoff().await, None);
}

#[tokio::test]
async fn complete_rejects_an_expired_callback_token() {
    let expired = token_expiring_in(-10);
    let addr = spawn_me_endpoint(expired.clone()).await;

    crate::test_support::ensure_crypto();
    let session = Arc::new(SessionManager::new(None, false));
    let svc =
        OAuthService::new(&format!("http://{addr}"), Arc::clone(&session), Duration::from_secs(5));

    let result = svc.complete(&expired).await;
    assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    assert_eq!(session.access_token().await, None);
}

#[tokio::test]
async fn user_info_normalizes_rejections() {
    let addr = spawn_me_endpoint("the-right-token".to_owned()).await;
    let svc = service(&format!("http://{addr}"));

    let result = svc.user_info("the-wrong-token").await;
    assert_eq!(
        result,
        Err(ApiError::Api { status: 401, message: "bad token".to_owned() })
    );
}
