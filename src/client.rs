//! Authenticated API client.
//!
//! DESIGN
//! ======
//! `ApiClient` gives every caller the same request contract: credentials
//! attached from the token cache, JSON or multipart bodies, a default
//! timeout, and the parsed JSON body back. It owns its token cache and
//! request tracker, so there is no process-global state; clones share both.
//!
//! ERROR HANDLING
//! ==============
//! No retries. Every failure is recorded in the verb's error slot and
//! returned. A 401/403 surfaces as [`ClientError::Status`] like any other
//! non-2xx status; redirecting to a login view is the caller's job.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth_route::AuthRoute;
use crate::config::ClientConfig;
use crate::cookies::{CookieStore, FileCookieStore, MemoryCookieStore, SESSION_ID_COOKIE};
use crate::error::ClientError;
use crate::inflight::RequestTracker;
use crate::request::{Body, Credentials, RequestConfig, Verb, prepare};
use crate::session::SessionCredentials;
use crate::token::TokenCache;
use crate::transport::{ReqwestTransport, Transport, TransportResponse};

#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    tokens: TokenCache,
    tracker: RequestTracker,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    #[must_use]
    pub fn new(config: ClientConfig, store: Arc<dyn CookieStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner { config, tokens: TokenCache::new(store), tracker: RequestTracker::new(), transport }),
        }
    }

    /// Build a client backed by `reqwest`, with a file cookie jar when
    /// `cookie_file` is configured and an in-memory jar otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie file cannot be opened or the HTTP
    /// client fails to build.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let store: Arc<dyn CookieStore> = match &config.cookie_file {
            Some(path) => Arc::new(FileCookieStore::open(path)?),
            None => Arc::new(MemoryCookieStore::new()),
        };
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::new(config, store, transport))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.config.base_url
    }

    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.inner.config.timeout
    }

    #[must_use]
    pub fn token_cache(&self) -> &TokenCache {
        &self.inner.tokens
    }

    #[must_use]
    pub fn cookies(&self) -> &dyn CookieStore {
        self.inner.tokens.store().as_ref()
    }

    /// `true` while any request is pending.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.inner.tracker.loading()
    }

    #[must_use]
    pub fn is_loading(&self, verb: Verb) -> bool {
        self.inner.tracker.is_loading(verb)
    }

    /// Last failure of `verb`, cleared when the next request of that verb starts.
    #[must_use]
    pub fn error(&self, verb: Verb) -> Option<ClientError> {
        self.inner.tracker.error(verb)
    }

    #[must_use]
    pub fn tracker(&self) -> &RequestTracker {
        &self.inner.tracker
    }

    // =========================================================================
    // VERBS
    // =========================================================================

    /// `GET path`.
    ///
    /// # Errors
    ///
    /// Returns the transport, status or decode failure, which is also
    /// recorded under the `fetch` error slot.
    pub async fn get(&self, path: &str, config: RequestConfig) -> Result<Value, ClientError> {
        self.request(Verb::Get, path, Body::Empty, config).await
    }

    /// `POST path` with a JSON or multipart body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`]; recorded under `post`.
    pub async fn post(&self, path: &str, body: impl Into<Body>, config: RequestConfig) -> Result<Value, ClientError> {
        self.request(Verb::Post, path, body.into(), config).await
    }

    /// `PUT path` with a JSON or multipart body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`]; recorded under `put`.
    pub async fn put(&self, path: &str, body: impl Into<Body>, config: RequestConfig) -> Result<Value, ClientError> {
        self.request(Verb::Put, path, body.into(), config).await
    }

    /// `DELETE path`, optionally with a body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`]; recorded under `delete`.
    pub async fn delete(&self, path: &str, body: impl Into<Body>, config: RequestConfig) -> Result<Value, ClientError> {
        self.request(Verb::Delete, path, body.into(), config).await
    }

    /// `GET path` decoded into `T`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`], plus [`ClientError::Decode`] on shape mismatch.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, config: RequestConfig) -> Result<T, ClientError> {
        decode(self.get(path, config).await?)
    }

    /// `POST path` decoded into `T`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::post`], plus [`ClientError::Decode`] on shape mismatch.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: impl Into<Body>,
        config: RequestConfig,
    ) -> Result<T, ClientError> {
        decode(self.post(path, body, config).await?)
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    async fn request(&self, verb: Verb, path: &str, body: Body, config: RequestConfig) -> Result<Value, ClientError> {
        let _guard = self.inner.tracker.start(verb);
        tracing::debug!(%verb, path, "request start");

        let result = self.execute(verb, path, body, &config).await;
        match &result {
            Ok(_) => tracing::debug!(%verb, path, "request done"),
            Err(e) => {
                tracing::debug!(%verb, path, error = %e, "request failed");
                self.inner.tracker.record_error(verb, e);
            }
        }
        result
    }

    async fn execute(&self, verb: Verb, path: &str, body: Body, config: &RequestConfig) -> Result<Value, ClientError> {
        let token = self.inner.tokens.token();
        let session_id = token.as_ref().and_then(|_| self.inner.tokens.session_id());
        let credentials = Credentials { token: token.as_deref(), session_id: session_id.as_deref() };

        let prepared = prepare(&self.inner.config.base_url, verb, path, body, config, self.inner.config.timeout, credentials)?;
        let timeout = prepared.timeout;
        let send = tokio::time::timeout(timeout, self.inner.transport.send(prepared));

        let outcome = match &config.cancel {
            Some(cancel) => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(ClientError::Cancelled),
                    outcome = send => outcome,
                }
            }
            None => send.await,
        };
        let response = outcome.map_err(|_| ClientError::Timeout { after_ms: millis(timeout) })??;

        let value = parse_body(response)?;
        if let Some(route) = AuthRoute::from_path(path) {
            self.absorb_auth_response(route, &value);
        }
        Ok(value)
    }

    /// Cache the CSRF token and persist the credential set carried by an
    /// auth response. Missing or malformed fields are skipped.
    fn absorb_auth_response(&self, route: AuthRoute, body: &Value) {
        let tokens = &self.inner.tokens;
        match body.get("csrf_token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => tokens.set_token(token),
            _ => tracing::debug!(route = route.path(), "auth response without csrf_token"),
        }

        // The session id pairs with the token just cached, so it is written even
        // when the rest of the credential set is incomplete.
        if let Some(session_id) = body.get("session_id").and_then(Value::as_str).filter(|s| !s.is_empty()) {
            if let Err(e) = tokens.store().set(SESSION_ID_COOKIE, session_id) {
                tracing::warn!(error = %e, "failed to persist session id cookie");
            }
            tokens.forget_session_id();
        }

        if let Some(credentials) = SessionCredentials::from_auth_response(body) {
            if let Err(e) = credentials.persist(tokens.store().as_ref()) {
                tracing::warn!(error = %e, "failed to persist session cookies");
            }
        }
    }
}

/// Decode a response body into `T`.
///
/// # Errors
///
/// Returns [`ClientError::Decode`] if the value does not match `T`.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}

fn parse_body(response: TransportResponse) -> Result<Value, ClientError> {
    if !response.is_success() {
        return Err(ClientError::Status {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        });
    }
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&response.body).map_err(|e| ClientError::Decode(e.to_string()))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
