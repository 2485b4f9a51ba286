// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers shared by unit and integration tests.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::session::token::TokenClaims;

/// Install the ring crypto provider for reqwest/rustls in test binaries.
///
/// Production installs this once in `main`; test binaries have no such
/// entry point, so each client constructor helper calls this first.
/// Installation is process-global and idempotent (later calls are no-ops).
pub fn ensure_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Build an unsigned compact token around the given claims. The signature
/// segment is filler; the codec never checks it.
pub fn make_token(claims: &TokenClaims) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap_or_default());
    format!("{header}.{payload}.sig")
}

/// A token for user `u1` expiring `exp_offset_secs` from now (negative
/// offsets produce an already-expired token).
pub fn token_expiring_in(exp_offset_secs: i64) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    make_token(&TokenClaims {
        user_id: "u1".to_owned(),
        email: "a@b.com".to_owned(),
        name: "A".to_owned(),
        is_email_verified: true,
        iat: Some(now.max(0) as u64),
        exp: Some((now + exp_offset_secs).max(0) as u64),
    })
}
