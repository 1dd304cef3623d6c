//! Error types for the API client.
//!
//! ERROR HANDLING
//! ==============
//! Every failure on the request path is recorded in the per-verb error slot
//! and returned to the caller, so `ClientError` is `Clone` and carries plain
//! strings instead of the transport's native error values.

// =============================================================================
// ERROR CODE
// =============================================================================

/// Grepable error code and retryable flag for caller-side reporting.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CLIENT ERROR
// =============================================================================

/// Errors produced by [`crate::client::ApiClient`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// Base URL and path did not form a usable URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A caller-supplied header name or value was rejected.
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The request never produced a response (network, DNS, connect).
    #[error("request failed: {0}")]
    Transport(String),

    /// The request did not settle within its timeout.
    #[error("request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// The backend answered with a non-2xx status.
    #[error("response status {status}")]
    Status { status: u16, body: String },

    /// The response body was not valid JSON.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The request body could not be serialized.
    #[error("request encode failed: {0}")]
    Encode(String),

    /// The caller cancelled the request before it settled.
    #[error("request cancelled")]
    Cancelled,

    /// The cookie store could not be read or written.
    #[error("cookie store failed: {0}")]
    Cookie(String),
}

impl ClientError {
    /// HTTP status of a non-2xx response, if this error carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `true` for 401/403 responses, the backend's signal that the session
    /// or CSRF token is missing or stale.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

impl ErrorCode for ClientError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::InvalidUrl(_) => "E_INVALID_URL",
            Self::InvalidHeader { .. } => "E_INVALID_HEADER",
            Self::Transport(_) => "E_TRANSPORT",
            Self::Timeout { .. } => "E_TIMEOUT",
            Self::Status { .. } => "E_STATUS",
            Self::Decode(_) => "E_DECODE",
            Self::Encode(_) => "E_ENCODE",
            Self::Cancelled => "E_CANCELLED",
            Self::Cookie(_) => "E_COOKIE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. } | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// COOKIE ERROR
// =============================================================================

/// Errors produced by persistent [`crate::cookies::CookieStore`] backends.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("cookie file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cookie file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<CookieError> for ClientError {
    fn from(err: CookieError) -> Self {
        Self::Cookie(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
