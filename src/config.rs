//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ClientError;

pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin prefixed to every request path, without a trailing `/`.
    pub base_url: String,
    /// Default per-request timeout, overridable per call.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Where the persisted cookie jar lives, if any.
    pub cookie_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Build a config for `base_url` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] if the URL is not `http(s)://`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            cookie_file: None,
        })
    }

    /// Build typed client config from environment variables.
    ///
    /// Required:
    /// - `PORTAL_BASE_URL`
    ///
    /// Optional:
    /// - `PORTAL_TIMEOUT_MS`: default 20000
    /// - `PORTAL_CONNECT_TIMEOUT_SECS`: default 10
    /// - `PORTAL_COOKIE_FILE`: no persisted jar when absent
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] if the base URL is missing or invalid.
    pub fn from_env() -> Result<Self, ClientError> {
        let raw = std::env::var("PORTAL_BASE_URL")
            .map_err(|_| ClientError::ConfigParse("PORTAL_BASE_URL not set".into()))?;
        Ok(Self::new(&raw)?.with_env_overrides())
    }

    /// Apply the optional `PORTAL_*` settings to a config whose base URL
    /// came from elsewhere, such as a command-line flag.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.timeout = Duration::from_millis(env_parse_u64("PORTAL_TIMEOUT_MS", DEFAULT_TIMEOUT_MS));
        self.connect_timeout =
            Duration::from_secs(env_parse_u64("PORTAL_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS));
        self.cookie_file = std::env::var("PORTAL_COOKIE_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cookie_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_file = Some(path.into());
        self
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let Some(rest) = trimmed.strip_prefix("http://").or_else(|| trimmed.strip_prefix("https://")) else {
        return Err(ClientError::ConfigParse(format!("base URL must start with http:// or https://: '{raw}'")));
    };
    if rest.is_empty() || rest.starts_with('/') {
        return Err(ClientError::ConfigParse(format!("base URL has no host: '{raw}'")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
