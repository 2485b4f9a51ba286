// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode as AxStatus};
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;

use super::*;
use crate::session::manager::SessionManager;
use crate::test_support::token_expiring_in;

const OK_ENVELOPE: &str = r#"{"success":true,"data":{"ok":true}}"#;

fn bearer_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

/// Backend double: `/protected` accepts only the token that
/// `/auth/refresh-token` hands out; `/echo` reports what it saw.
struct MockBackend {
    addr: SocketAddr,
    fresh_access: String,
    refresh_calls: Arc<AtomicU32>,
}

async fn spawn_backend(refresh_status: u16, refresh_delay: Duration) -> MockBackend {
    let fresh_access = token_expiring_in(3600);
    let refresh_calls = Arc::new(AtomicU32::new(0));

    let accepted = fresh_access.clone();
    let protected = get(move |headers: HeaderMap| {
        let accepted = accepted.clone();
        async move {
            if bearer_of(&headers).as_deref() == Some(accepted.as_str()) {
                (AxStatus::OK, OK_ENVELOPE.to_owned())
            } else {
                (AxStatus::UNAUTHORIZED, r#"{"message":"token expired"}"#.to_owned())
            }
        }
    });

    let echo = get(move |headers: HeaderMap| async move {
        let body = serde_json::json!({
            "success": true,
            "data": { "bearer": bearer_of(&headers) },
        });
        (AxStatus::OK, body.to_string())
    });

    let issued = fresh_access.clone();
    let calls = Arc::clone(&refresh_calls);
    let refresh = post(move |_body: String| {
        let issued = issued.clone();
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(refresh_delay).await;
            let status =
                AxStatus::from_u16(refresh_status).unwrap_or(AxStatus::INTERNAL_SERVER_ERROR);
            let body = if status.is_success() {
                serde_json::json!({
                    "access_token": issued,
                    "refresh_token": token_expiring_in(604800),
                })
                .to_string()
            } else {
                r#"{"message":"refresh rejected"}"#.to_owned()
            };
            (status, body)
        }
    });

    let app = Router::new()
        .route("/protected", protected)
        .route("/echo", echo)
        .route("/auth/refresh-token", refresh);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    MockBackend { addr, fresh_access, refresh_calls }
}

fn client_for(backend: &MockBackend) -> ApiClient {
    crate::test_support::ensure_crypto();
    let session = Arc::new(SessionManager::new(None, false));
    ApiClient::new(
        &format!("http://{}", backend.addr),
        session,
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn valid_token_is_attached_as_bearer() {
    let backend = spawn_backend(200, Duration::ZERO).await;
    let client = client_for(&backend);
    let token = token_expiring_in(3600);
    client.session().set_access_token(&token).await;

    let value: Value = client.send(RequestSpec::get("/echo")).await.unwrap_or_default();
    assert_eq!(value["data"]["bearer"], Value::String(token));
}

#[tokio::test]
async fn expired_token_sends_unauthenticated() {
    let backend = spawn_backend(200, Duration::ZERO).await;
    let client = client_for(&backend);
    client.session().set_access_token(&token_expiring_in(-10)).await;

    let value: Value = client.send(RequestSpec::get("/echo")).await.unwrap_or_default();
    assert_eq!(value["data"]["bearer"], Value::Null);
}

#[tokio::test]
async fn unauthorized_triggers_refresh_and_replay() {
    let backend = spawn_backend(200, Duration::ZERO).await;
    let client = client_for(&backend);
    client
        .session()
        .set_tokens(&token_expiring_in(-10), Some(&token_expiring_in(604800)))
        .await;

    let value: Value = client
        .send(RequestSpec::get("/protected"))
        .await
        .unwrap_or_default();
    assert_eq!(value["data"]["ok"], Value::Bool(true));

    assert_eq!(backend.refresh_calls.load(Ordering::Relaxed), 1);
    // New pair was stored.
    assert_eq!(
        client.session().access_token().await.as_deref(),
        Some(backend.fresh_access.as_str())
    );
}

#[tokio::test]
async fn missing_refresh_token_fails_fast_and_clears() {
    let backend = spawn_backend(200, Duration::ZERO).await;
    let client = client_for(&backend);
    client.session().set_access_token(&token_expiring_in(-10)).await;

    let result: Result<Value, ApiError> = client.send(RequestSpec::get("/protected")).await;
    assert_eq!(
        result,
        Err(ApiError::RefreshFailed("no valid refresh token".to_owned()))
    );

    // No exchange was attempted and the session is gone.
    assert_eq!(backend.refresh_calls.load(Ordering::Relaxed), 0);
    assert_eq!(client.session().access_token().await, None);
    assert!(!client.gate.is_refreshing());
}

#[tokio::test]
async fn refresh_rejection_clears_tokens() {
    let backend = spawn_backend(401, Duration::ZERO).await;
    let client = client_for(&backend);
    client
        .session()
        .set_tokens(&token_expiring_in(-10), Some(&token_expiring_in(604800)))
        .await;

    let result: Result<Value, ApiError> = client.send(RequestSpec::get("/protected")).await;
    assert!(matches!(result, Err(ApiError::RefreshFailed(_))));

    assert_eq!(client.session().access_token().await, None);
    assert_eq!(client.session().refresh_token().await, None);
    assert!(!client.gate.is_refreshing());
}

#[tokio::test]
async fn replayed_request_is_not_retried_again() {
    // Refresh succeeds but the backend keeps answering 401: the replay's
    // failure is final, with exactly one exchange.
    let backend = spawn_stubborn_backend().await;
    let client = client_for(&backend);
    client
        .session()
        .set_tokens(&token_expiring_in(-10), Some(&token_expiring_in(604800)))
        .await;

    let result: Result<Value, ApiError> = client.send(RequestSpec::get("/protected")).await;
    assert!(matches!(result, Err(ApiError::Unauthorized(_))), "got {result:?}");
    assert_eq!(backend.refresh_calls.load(Ordering::Relaxed), 1);
}

/// Backend whose refresh endpoint succeeds but whose `/protected` route
/// rejects every token, to exercise the retry-once cap.
async fn spawn_stubborn_backend() -> MockBackend {
    let refresh_calls = Arc::new(AtomicU32::new(0));

    let protected = get(|| async {
        (AxStatus::UNAUTHORIZED, r#"{"message":"always unauthorized"}"#.to_owned())
    });

    let calls = Arc::clone(&refresh_calls);
    let refresh = post(move |_body: String| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::Relaxed);
            let body = serde_json::json!({ "access_token": token_expiring_in(3600) }).to_string();
            (AxStatus::OK, body)
        }
    });

    let app = Router::new()
        .route("/protected", protected)
        .route("/auth/refresh-token", refresh);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    MockBackend { addr, fresh_access: String::new(), refresh_calls }
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    // Slow exchange so every request observes its 401 while the refresh
    // is still in flight.
    let backend = spawn_backend(200, Duration::from_millis(200)).await;
    let client = client_for(&backend);
    client
        .session()
        .set_tokens(&token_expiring_in(-10), Some(&token_expiring_in(604800)))
        .await;

    let (a, b, c, d, e) = tokio::join!(
        client.send::<Value>(RequestSpec::get("/protected")),
        client.send::<Value>(RequestSpec::get("/protected")),
        client.send::<Value>(RequestSpec::get("/protected")),
        client.send::<Value>(RequestSpec::get("/protected")),
        client.send::<Value>(RequestSpec::get("/protected")),
    );

    for result in [a, b, c, d, e] {
        let value = result.unwrap_or_default();
        assert_eq!(value["data"]["ok"], Value::Bool(true));
    }
    assert_eq!(backend.refresh_calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn concurrent_requests_share_the_refresh_failure() {
    let backend = spawn_backend(500, Duration::from_millis(200)).await;
    let client = client_for(&backend);
    client
        .session()
        .set_tokens(&token_expiring_in(-10), Some(&token_expiring_in(604800)))
        .await;

    let (a, b, c) = tokio::join!(
        client.send::<Value>(RequestSpec::get("/protected")),
        client.send::<Value>(RequestSpec::get("/protected")),
        client.send::<Value>(RequestSpec::get("/protected")),
    );

    for result in [a, b, c] {
        assert!(matches!(result, Err(ApiError::RefreshFailed(_))), "got {result:?}");
    }
    assert_eq!(backend.refresh_calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn non_auth_errors_are_normalized() {
    let app = Router::new().route(
        "/missing",
        get(|| async { (AxStatus::NOT_FOUND, r#"{"message":"Manga not found"}"#.to_owned()) }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    crate::test_support::ensure_crypto();
    let session = Arc::new(SessionManager::new(None, false));
    let client = ApiClient::new(&format!("http://{addr}"), session, Duration::from_secs(5));

    let result: Result<Value, ApiError> = client.send(RequestSpec::get("/missing")).await;
    assert_eq!(
        result,
        Err(ApiError::Api { status: 404, message: "Manga not found".to_owned() })
    );
}

#[tokio::test]
async fn empty_success_body_reads_as_null() {
    let app = Router::new().route("/empty", get(|| async { (AxStatus::OK, String::new()) }));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    crate::test_support::ensure_crypto();
    let session = Arc::new(SessionManager::new(None, false));
    let client = ApiClient::new(&format!("http://{addr}"), session, Duration::from_secs(5));

    let value: Value = client.send(RequestSpec::get("/empty")).await.unwrap_or(Value::Bool(false));
    assert_eq!(value, Value::Null);
}
