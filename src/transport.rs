//! HTTP transport seam.
//!
//! The client talks to a [`Transport`] so tests can substitute a mock; the
//! production implementation is a thin `reqwest` wrapper. Transports do not
//! interpret status codes.

use reqwest::multipart::{Form, Part};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::request::{FormPart, MultipartForm, PreparedBody, PreparedRequest, Verb};

/// Raw response as returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a prepared request. Enables mocking in tests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] or [`ClientError::Timeout`] when no
    /// response was received.
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, ClientError>;
}

// =============================================================================
// REQWEST
// =============================================================================

pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns [`ClientError::HttpClientBuild`] if the client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, ClientError> {
        let timeout = request.timeout;
        let method = match request.verb {
            Verb::Get => reqwest::Method::GET,
            Verb::Post => reqwest::Method::POST,
            Verb::Put => reqwest::Method::PUT,
            Verb::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .http
            .request(method, &request.url)
            .headers(request.headers)
            .timeout(timeout);
        builder = match request.body {
            PreparedBody::Empty => builder,
            PreparedBody::Json(bytes) => builder.body(bytes),
            PreparedBody::Multipart(form) => builder.multipart(to_reqwest_form(form)?),
        };

        let response = builder.send().await.map_err(|e| map_reqwest_error(&e, timeout))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(&e, timeout))?;

        Ok(TransportResponse { status, body: body.to_vec() })
    }
}

fn to_reqwest_form(form: MultipartForm) -> Result<Form, ClientError> {
    let mut out = Form::new();
    for part in form.parts {
        out = match part {
            FormPart::Text { name, value } => out.text(name, value),
            FormPart::File { name, filename, bytes, mime } => {
                let mut file = Part::bytes(bytes).file_name(filename);
                if let Some(mime) = mime {
                    file = file
                        .mime_str(&mime)
                        .map_err(|e| ClientError::Encode(format!("invalid mime type '{mime}': {e}")))?;
                }
                out.part(name, file)
            }
        };
    }
    Ok(out)
}

fn map_reqwest_error(err: &reqwest::Error, timeout: std::time::Duration) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout { after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX) }
    } else if err.is_builder() {
        ClientError::InvalidUrl(err.to_string())
    } else {
        ClientError::Transport(err.to_string())
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
