// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::token_expiring_in;

fn manager() -> SessionManager {
    SessionManager::new(None, false)
}

#[tokio::test]
async fn set_and_read_both_tokens() {
    let session = manager();
    session.set_access_token("acc").await;
    session.set_refresh_token("ref").await;

    assert_eq!(session.access_token().await.as_deref(), Some("acc"));
    assert_eq!(session.refresh_token().await.as_deref(), Some("ref"));
}

#[tokio::test]
async fn set_tokens_skips_absent_refresh() {
    let session = manager();
    session.set_refresh_token("keep-me").await;
    session.set_tokens("new-access", None).await;

    assert_eq!(session.access_token().await.as_deref(), Some("new-access"));
    assert_eq!(session.refresh_token().await.as_deref(), Some("keep-me"));
}

#[tokio::test]
async fn clear_tokens_leaves_both_absent() {
    let session = manager();
    session.set_tokens("a", Some("r")).await;
    session.clear_tokens().await;

    assert_eq!(session.access_token().await, None);
    assert_eq!(session.refresh_token().await, None);
}

#[tokio::test]
async fn mutations_broadcast_token_events() {
    let session = manager();
    let mut rx = session.subscribe();

    session.set_tokens("a", Some("r")).await;
    assert_eq!(rx.try_recv().ok(), Some(TokenEvent::Changed));

    session.clear_tokens().await;
    assert_eq!(rx.try_recv().ok(), Some(TokenEvent::Cleared));
}

#[tokio::test]
async fn validity_tracks_embedded_expiry() {
    let session = manager();

    session.set_access_token(&token_expiring_in(3600)).await;
    assert!(session.is_access_token_valid().await);

    session.set_access_token(&token_expiring_in(-10)).await;
    assert!(!session.is_access_token_valid().await);

    assert!(!session.is_refresh_token_valid().await);
}

#[tokio::test]
async fn should_refresh_inside_the_buffer_window() {
    let session = manager();

    // 200s to expiry: inside the 300s window.
    session.set_access_token(&token_expiring_in(200)).await;
    assert!(session.should_refresh().await);

    // 600s to expiry: comfortably outside.
    session.set_access_token(&token_expiring_in(600)).await;
    assert!(!session.should_refresh().await);
}

#[tokio::test]
async fn should_refresh_false_without_token() {
    assert!(!manager().should_refresh().await);
}

#[tokio::test]
async fn should_refresh_true_for_unreadable_expiry() {
    let session = manager();
    session.set_access_token("opaque-token-without-claims").await;
    assert!(session.should_refresh().await);
}

#[tokio::test]
async fn user_from_token_decodes_claims() {
    let session = manager();
    session.set_access_token(&token_expiring_in(86400)).await;

    let user = session.user_from_token().await.expect("user should decode");
    assert_eq!(user.id, "u1");
    assert_eq!(user.email, "a@b.com");
    assert_eq!(user.name, "A");
    assert!(user.is_email_verified);
}

#[tokio::test]
async fn user_from_token_none_when_expired() {
    let session = manager();
    session.set_access_token(&token_expiring_in(-10)).await;
    assert!(session.user_from_token().await.is_none());
}

#[tokio::test]
async fn auth_state_authenticated_with_valid_token() {
    let session = manager();
    let token = token_expiring_in(86400);
    session.set_tokens(&token, Some(&token_expiring_in(604800))).await;

    let state = session.auth_state().await;
    assert!(state.is_authenticated);
    assert_eq!(state.token.as_deref(), Some(token.as_str()));
    assert!(state.user.is_some());
}

#[tokio::test]
async fn auth_state_clears_cookies_for_expired_token() {
    let session = manager();
    session.set_tokens(&token_expiring_in(-10), Some("stale-refresh")).await;

    let state = session.auth_state().await;
    assert!(!state.is_authenticated);
    assert!(state.user.is_none());
    assert!(state.token.is_none());

    // Lazy cleanup on read: no cookies remain.
    assert_eq!(session.access_token().await, None);
    assert_eq!(session.refresh_token().await, None);
}

#[tokio::test]
async fn auth_state_keeps_a_token_inside_the_refresh_margin() {
    // 100s to expiry: treated as expired for bearer purposes, but the
    // session itself survives until the literal expiry so the monitor
    // can refresh instead of logging the user out.
    let session = manager();
    session.set_tokens(&token_expiring_in(100), Some(&token_expiring_in(604800))).await;

    assert!(!session.is_access_token_valid().await);
    assert!(session.should_refresh().await);

    let state = session.auth_state().await;
    assert!(state.is_authenticated);
    assert!(state.user.is_some());
    assert!(session.access_token().await.is_some());
}

#[tokio::test]
async fn auth_state_anonymous_without_token() {
    let state = manager().auth_state().await;
    assert!(!state.is_authenticated);
    assert!(state.user.is_none());
    assert!(state.token.is_none());
}

#[tokio::test]
async fn oauth_handoff_is_consumed_once() {
    let session = manager();
    session.set_oauth_handoff("handoff-token").await;

    assert_eq!(session.take_oauth_handoff().await.as_deref(), Some("handoff-token"));
    assert_eq!(session.take_oauth_handoff().await, None);
}

#[tokio::test]
async fn token_info_summarizes_both_tokens() {
    let session = manager();
    session.set_tokens(&token_expiring_in(3600), None).await;

    let info = session.token_info().await;
    assert!(info.has_access_token);
    assert!(!info.access_token_expired);
    assert!(!info.has_refresh_token);
    assert!(info.refresh_token_expired);
    assert!(info.access_claims.is_some());
    assert!(info.refresh_claims.is_none());
}
