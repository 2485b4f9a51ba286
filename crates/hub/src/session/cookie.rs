// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cookie jar: key/value persistence with per-entry expiration.
//!
//! Entries live in a JSON file under the state directory and are written
//! atomically (unique temp file + rename). A jar can also be *detached*
//! (no backing file at all), in which case reads and writes operate purely
//! in memory and persistence silently skips. Load failures degrade to an
//! empty jar; they are never surfaced to session reads.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::session::epoch_secs;

/// Same-site policy recorded on a cookie entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

/// Options applied when storing a cookie.
#[derive(Debug, Clone)]
pub struct CookieOptions {
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieOptions {
    /// Defaults: root path, strict same-site, secure when in production.
    pub fn defaults(production: bool) -> Self {
        Self { path: "/".to_owned(), domain: None, secure: production, same_site: SameSite::Strict }
    }
}

/// A single stored cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieEntry {
    /// Percent-encoded value.
    pub value: String,
    /// Expiry as epoch seconds. Zero means no expiry (session cookie).
    #[serde(default)]
    pub expires_at: u64,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub same_site: SameSite,
}

impl CookieEntry {
    fn is_expired(&self, now: u64) -> bool {
        self.expires_at != 0 && self.expires_at <= now
    }
}

/// File-backed cookie jar.
#[derive(Debug, Default)]
pub struct CookieJar {
    path: Option<PathBuf>,
    entries: IndexMap<String, CookieEntry>,
}

impl CookieJar {
    /// Open a jar backed by `path`, loading any existing entries.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        Self { path: Some(path), entries }
    }

    /// Create a jar with no backing file. Reads and writes stay in memory.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Re-read the backing file so writes from other processes win.
    pub fn reload(&mut self) {
        if let Some(ref path) = self.path {
            self.entries = load_entries(path);
        }
    }

    /// Store a cookie expiring `ttl_minutes` from now.
    pub fn set(&mut self, name: &str, value: &str, ttl_minutes: u64, options: CookieOptions) {
        let expires_at = epoch_secs() + ttl_minutes * 60;
        self.set_with_expiry(name, value, expires_at, options);
    }

    /// Store a cookie with an explicit expiry (epoch seconds; 0 = none).
    pub fn set_with_expiry(
        &mut self,
        name: &str,
        value: &str,
        expires_at: u64,
        options: CookieOptions,
    ) {
        self.entries.insert(
            name.to_owned(),
            CookieEntry {
                value: percent_encode(value),
                expires_at,
                path: options.path,
                domain: options.domain,
                secure: options.secure,
                same_site: options.same_site,
            },
        );
        self.save();
    }

    /// Fetch a cookie's decoded value. Expired entries read as absent.
    pub fn get(&self, name: &str) -> Option<String> {
        let entry = self.entries.get(name)?;
        if entry.is_expired(epoch_secs()) {
            return None;
        }
        Some(percent_decode(&entry.value))
    }

    /// Delete a cookie immediately.
    pub fn remove(&mut self, name: &str) {
        if self.entries.shift_remove(name).is_some() {
            self.save();
        }
    }

    /// Every readable (non-expired) entry, decoded, in insertion order.
    pub fn get_all(&self) -> IndexMap<String, String> {
        let now = epoch_secs();
        self.entries
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(name, e)| (name.clone(), percent_decode(&e.value)))
            .collect()
    }

    /// Write the jar to its backing file. No-op for detached jars.
    fn save(&self) {
        let Some(ref path) = self.path else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(err = %e, "failed to create cookie jar dir");
                return;
            }
        }
        let json = match serde_json::to_string_pretty(&self.entries) {
            Ok(j) => j,
            Err(e) => {
                warn!(err = %e, "failed to serialize cookie jar");
                return;
            }
        };
        if let Err(e) = atomic_write(path, &json) {
            warn!(path = %path.display(), err = %e, "failed to persist cookie jar");
        }
    }
}

fn load_entries(path: &Path) -> IndexMap<String, CookieEntry> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            debug!(path = %path.display(), "no cookie jar: {e}");
            return IndexMap::new();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %path.display(), "unreadable cookie jar, starting empty: {e}");
            IndexMap::new()
        }
    }
}

/// Write with a unique temp filename (PID + counter) then rename, so
/// concurrent saves racing on the same `.tmp` cannot corrupt the jar.
fn atomic_write(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Percent-encode a cookie value (non-unreserved bytes escaped).
pub(crate) fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{b:02X}"));
            }
        }
    }
    out
}

/// Decode a percent-encoded value. Malformed escapes pass through verbatim.
pub(crate) fn percent_decode(s: &str) -> String {
    fn hex_val(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
#[path = "cookie_tests.rs"]
mod tests;
