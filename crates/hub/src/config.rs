// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the mangahub client.
#[derive(Debug, Clone, clap::Args)]
pub struct HubConfig {
    /// Base URL of the MangaHub application backend.
    #[arg(long, default_value = "http://127.0.0.1:8080", env = "MANGAHUB_API_URL")]
    pub api_url: String,

    /// Directory for session state (cookie jar). Defaults to the
    /// platform state dir.
    #[arg(long, env = "MANGAHUB_STATE_DIR")]
    pub state_dir: Option<std::path::PathBuf>,

    /// Treat the environment as production (secure cookies).
    #[arg(long, env = "MANGAHUB_PRODUCTION")]
    pub production: bool,

    /// HTTP request timeout in milliseconds.
    #[arg(long, default_value_t = 10000, env = "MANGAHUB_HTTP_TIMEOUT_MS")]
    pub http_timeout_ms: u64,

    /// Token check interval for `watch`, in seconds.
    #[arg(long, default_value_t = 60, env = "MANGAHUB_CHECK_INTERVAL_SECS")]
    pub check_interval_secs: u64,

    /// Log level filter.
    #[arg(long, default_value = "info", env = "MANGAHUB_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: "text" or "json".
    #[arg(long, default_value = "text", env = "MANGAHUB_LOG_FORMAT")]
    pub log_format: String,
}

impl HubConfig {
    /// Reject configurations that cannot work before any network traffic.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api-url must be an http(s) URL: {}", self.api_url);
        }
        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!("log-format must be \"text\" or \"json\": {}", self.log_format);
        }
        if self.http_timeout_ms == 0 {
            anyhow::bail!("http-timeout-ms must be positive");
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.http_timeout_ms)
    }

    pub fn check_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.check_interval_secs)
    }

    /// Location of the cookie jar file.
    pub fn cookie_jar_path(&self) -> std::path::PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(crate::session::state_dir)
            .join("cookies.json")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
