// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed REST services over the application backend.

pub mod auth;
pub mod cache;
pub mod follow;
pub mod manga;
pub mod oauth;

use serde::Deserialize;

use crate::error::{ApiError, GENERIC_ERROR};

/// Response envelope used by the application backend.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default, rename = "totalPages")]
    pub total_pages: u32,
}

impl<T> Envelope<T> {
    /// Unwrap the payload. A `success: false` envelope or a missing body
    /// becomes a normalized error carrying the server's message.
    pub fn into_data(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Api {
                status: 200,
                message: self.message.unwrap_or_else(|| GENERIC_ERROR.to_owned()),
            });
        }
        self.data.ok_or_else(|| ApiError::Decode("response envelope had no data".to_owned()))
    }

    /// Check the envelope's success flag, discarding any payload.
    pub fn ensure_success(self) -> Result<(), ApiError> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::Api {
                status: 200,
                message: self.message.unwrap_or_else(|| GENERIC_ERROR.to_owned()),
            })
        }
    }
}
