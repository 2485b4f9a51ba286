// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use base64::Engine as _;

use super::*;
use crate::test_support::{make_token, token_expiring_in};

fn claims(exp: Option<u64>) -> TokenClaims {
    TokenClaims {
        user_id: "u1".to_owned(),
        email: "a@b.com".to_owned(),
        name: "A".to_owned(),
        is_email_verified: true,
        iat: Some(epoch_secs()),
        exp,
    }
}

#[test]
fn decode_roundtrips_claims() {
    let token = make_token(&claims(Some(epoch_secs() + 86400)));
    let decoded = decode(&token).expect("token should decode");
    assert_eq!(decoded.user_id, "u1");
    assert_eq!(decoded.email, "a@b.com");
    assert_eq!(decoded.name, "A");
    assert!(decoded.is_email_verified);
}

#[test]
fn decode_uses_camel_case_claim_names() {
    let token = make_token(&claims(None));
    // The wire form carries userId / isEmailVerified, not Rust names.
    let payload_segment = token.split('.').nth(1).expect("claims segment");
    let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_segment)
        .expect("valid base64url");
    let text = String::from_utf8(raw).expect("utf8 claims");
    assert!(text.contains("\"userId\""), "claims segment: {text}");
    assert!(text.contains("\"isEmailVerified\""), "claims segment: {text}");
}

#[test]
fn decode_rejects_garbage() {
    assert!(decode("not-a-token").is_none());
    assert!(decode("a.!!!.c").is_none());
    assert!(decode("").is_none());
}

#[test]
fn decode_rejects_non_json_claims() {
    let seg = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(b"plain text");
    assert!(decode(&format!("h.{seg}.s")).is_none());
}

#[test]
fn undecodable_token_is_expired() {
    assert!(is_expired("garbage"));
}

#[test]
fn missing_exp_claim_is_expired() {
    let token = make_token(&claims(None));
    assert!(is_expired(&token));
}

#[test]
fn expiry_boundary_is_inclusive_at_the_buffer() {
    // now >= exp - 300 means expired; exactly exp - 300 counts.
    let at_boundary = make_token(&claims(Some(epoch_secs() + EXPIRY_BUFFER_SECS)));
    assert!(is_expired(&at_boundary));

    let inside_buffer = make_token(&claims(Some(epoch_secs() + EXPIRY_BUFFER_SECS - 5)));
    assert!(is_expired(&inside_buffer));

    let outside_buffer = make_token(&claims(Some(epoch_secs() + EXPIRY_BUFFER_SECS + 60)));
    assert!(!is_expired(&outside_buffer));
}

#[test]
fn literally_expired_token_is_expired() {
    assert!(is_expired(&token_expiring_in(-10)));
}

#[test]
fn past_expiry_ignores_the_buffer() {
    // Inside the margin: expired for bearer purposes, not yet past.
    let in_margin = token_expiring_in(100);
    assert!(is_expired(&in_margin));
    assert!(!is_past_expiry(&in_margin));

    assert!(is_past_expiry(&token_expiring_in(-10)));
    assert!(is_past_expiry("garbage"));

    let no_exp = make_token(&claims(None));
    assert!(is_past_expiry(&no_exp));
}

#[test]
fn time_until_expiry_floors_at_zero() {
    let past = token_expiring_in(-100);
    assert_eq!(time_until_expiry(&past), Some(Duration::ZERO));

    let future = token_expiring_in(3600);
    let remaining = time_until_expiry(&future);
    assert!(remaining.is_some());
    assert!(remaining.unwrap_or_default() > Duration::from_secs(3500));
}

#[test]
fn time_until_expiry_none_without_exp() {
    let token = make_token(&claims(None));
    assert_eq!(time_until_expiry(&token), None);
}

#[test]
fn user_derives_from_claims() {
    let c = claims(Some(epoch_secs() + 86400));
    let user = User::from(&c);
    assert_eq!(
        user,
        User {
            id: "u1".to_owned(),
            email: "a@b.com".to_owned(),
            name: "A".to_owned(),
            is_email_verified: true,
        }
    );
}
