//! Mudrex exchange configuration.

use serde::Deserialize;

/// Production futures API root.
pub const DEFAULT_BASE_URL: &str = "https://trade.mudrex.com/fapi/v1";

/// Mudrex REST API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MudrexConfig {
    /// Futures API root, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub http: MudrexHttpConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for MudrexConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            http: MudrexHttpConfig::default(),
        }
    }
}

/// Mudrex HTTP client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MudrexHttpConfig {
    /// Request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_http_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Attempts for idempotent reads that hit a connect or timeout error.
    #[serde(default = "default_http_retry_max_attempts")]
    pub retry_max_attempts: u32,
    /// Backoff between retries in milliseconds.
    #[serde(default = "default_http_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

const fn default_http_timeout_ms() -> u64 {
    10_000
}

const fn default_http_connect_timeout_ms() -> u64 {
    3000
}

const fn default_http_retry_max_attempts() -> u32 {
    3
}

const fn default_http_retry_backoff_ms() -> u64 {
    250
}

impl Default for MudrexHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_http_timeout_ms(),
            connect_timeout_ms: default_http_connect_timeout_ms(),
            retry_max_attempts: default_http_retry_max_attempts(),
            retry_backoff_ms: default_http_retry_backoff_ms(),
        }
    }
}
