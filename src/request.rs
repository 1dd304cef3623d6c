//! Request preparation: verbs, bodies, per-call config and header assembly.
//!
//! DESIGN
//! ======
//! `prepare` is pure so the header contract can be tested without a
//! transport. Assembly order:
//! 1. defaults (`accept: application/json`, configured timeout),
//! 2. caller headers, replacing defaults of the same name,
//! 3. `csrf-token` / `session-id` when resolvable, never with empty values,
//! 4. `content-type: application/json` for JSON bodies; removed for
//!    multipart bodies so the transport can set the boundary.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

pub const CSRF_TOKEN_HEADER: &str = "csrf-token";
pub const SESSION_ID_HEADER: &str = "session-id";

// =============================================================================
// VERB
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub const ALL: [Self; 4] = [Self::Get, Self::Post, Self::Put, Self::Delete];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Key of this verb's error slot (`fetch`, `post`, `put`, `delete`).
    #[must_use]
    pub fn state_key(self) -> &'static str {
        match self {
            Self::Get => "fetch",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Get => 0,
            Self::Post => 1,
            Self::Put => 2,
            Self::Delete => 3,
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// BODY
// =============================================================================

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, filename: String, bytes: Vec<u8>, mime: Option<String> },
}

/// Multipart payload, kept inspectable until the transport converts it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub parts: Vec<FormPart>,
}

impl MultipartForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text { name: name.into(), value: value.into() });
        self
    }

    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        bytes: Vec<u8>,
        mime: Option<&str>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            filename: filename.into(),
            bytes,
            mime: mime.map(str::to_owned),
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

impl Body {
    /// Serialize any `Serialize` value into a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Encode`] if serialization fails.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ClientError> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| ClientError::Encode(e.to_string()))
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<MultipartForm> for Body {
    fn from(form: MultipartForm) -> Self {
        Self::Multipart(form)
    }
}

impl From<()> for Body {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

// =============================================================================
// REQUEST CONFIG
// =============================================================================

/// Per-call options: extra headers, timeout override, cancellation.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl RequestConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

// =============================================================================
// PREPARED REQUEST
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PreparedBody {
    Empty,
    Json(Vec<u8>),
    Multipart(MultipartForm),
}

/// Fully assembled request handed to a [`crate::transport::Transport`].
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub verb: Verb,
    pub url: String,
    pub headers: HeaderMap,
    pub body: PreparedBody,
    pub timeout: Duration,
}

impl PreparedRequest {
    /// Header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Credentials resolved from the token cache at send time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    pub token: Option<&'a str>,
    pub session_id: Option<&'a str>,
}

/// Assemble the outgoing request.
///
/// # Errors
///
/// Returns [`ClientError::InvalidHeader`] for unusable caller headers or
/// credential values, and [`ClientError::Encode`] if the JSON body cannot be
/// serialized.
pub fn prepare(
    base_url: &str,
    verb: Verb,
    path: &str,
    body: Body,
    config: &RequestConfig,
    default_timeout: Duration,
    credentials: Credentials<'_>,
) -> Result<PreparedRequest, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    for (name, value) in &config.headers {
        let (name, value) = parse_header(name, value)?;
        headers.insert(name, value);
    }

    if let Some(token) = credentials.token.filter(|t| !t.is_empty()) {
        let (name, value) = parse_header(CSRF_TOKEN_HEADER, token)?;
        headers.insert(name, value);
        if let Some(session_id) = credentials.session_id.filter(|s| !s.is_empty()) {
            let (name, value) = parse_header(SESSION_ID_HEADER, session_id)?;
            headers.insert(name, value);
        }
    }

    let body = match body {
        Body::Empty => PreparedBody::Empty,
        Body::Json(value) => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            let bytes = serde_json::to_vec(&value).map_err(|e| ClientError::Encode(e.to_string()))?;
            PreparedBody::Json(bytes)
        }
        Body::Multipart(form) => {
            headers.remove(CONTENT_TYPE);
            PreparedBody::Multipart(form)
        }
    };

    Ok(PreparedRequest {
        verb,
        url: join_url(base_url, path),
        headers,
        body,
        timeout: config.timeout.unwrap_or(default_timeout),
    })
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ClientError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ClientError::InvalidHeader { name: name.to_owned(), reason: e.to_string() })?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| ClientError::InvalidHeader { name: name.to_owned(), reason: e.to_string() })?;
    Ok((header_name, header_value))
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') { format!("{base}{path}") } else { format!("{base}/{path}") }
}

#[cfg(test)]
#[path = "request_test.rs"]
mod tests;
