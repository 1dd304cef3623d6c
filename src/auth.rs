//! Login, guest login, registration and logout flows.
//!
//! SYSTEM CONTEXT
//! ==============
//! These are the calls a login page makes. The client itself caches the
//! CSRF token and session cookies from the responses; this module shapes
//! the request bodies and reads back the approval flag.

use serde::Serialize;
use serde_json::Value;

use crate::auth_route::AuthRoute;
use crate::client::ApiClient;
use crate::error::ClientError;
use crate::request::{Body, RequestConfig};
use crate::session::SessionCredentials;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email_id: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email_id: String,
    pub password: String,
    pub role: String,
}

/// Result of an auth call that reached the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// `false` when the backend rejected the credentials with a 2xx body.
    pub approval: bool,
    pub credentials: Option<SessionCredentials>,
    pub message: Option<String>,
}

impl LoginOutcome {
    fn from_body(body: &Value) -> Self {
        let credentials = SessionCredentials::from_auth_response(body);
        let approval = body
            .get("approval")
            .and_then(Value::as_bool)
            .unwrap_or(credentials.is_some());
        let message = body
            .get("message")
            .or_else(|| body.get("detail"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        Self { approval, credentials, message }
    }
}

/// `POST /login`.
///
/// # Errors
///
/// Returns the client error if the request fails.
pub async fn login(client: &ApiClient, request: &LoginRequest) -> Result<LoginOutcome, ClientError> {
    let body = client
        .post(AuthRoute::Login.path(), Body::json(request)?, RequestConfig::new())
        .await?;
    let outcome = LoginOutcome::from_body(&body);
    tracing::info!(approval = outcome.approval, role = %request.role, "login");
    Ok(outcome)
}

/// `GET /login_guest`.
///
/// # Errors
///
/// Returns the client error if the request fails.
pub async fn login_guest(client: &ApiClient) -> Result<LoginOutcome, ClientError> {
    let body = client.get(AuthRoute::LoginGuest.path(), RequestConfig::new()).await?;
    let outcome = LoginOutcome::from_body(&body);
    tracing::info!(approval = outcome.approval, "guest login");
    Ok(outcome)
}

/// `POST /registration`.
///
/// # Errors
///
/// Returns the client error if the request fails.
pub async fn register(client: &ApiClient, registration: &Registration) -> Result<LoginOutcome, ClientError> {
    let body = client
        .post(AuthRoute::Registration.path(), Body::json(registration)?, RequestConfig::new())
        .await?;
    let outcome = LoginOutcome::from_body(&body);
    tracing::info!(approval = outcome.approval, "registration");
    Ok(outcome)
}

/// Drop the CSRF token and every session cookie. Purely local: session
/// expiry on the backend is the backend's job.
///
/// # Errors
///
/// Returns [`ClientError::Cookie`] if a session cookie cannot be removed.
pub fn logout(client: &ApiClient) -> Result<(), ClientError> {
    client.token_cache().clear_token();
    SessionCredentials::clear(client.cookies())?;
    tracing::info!("logged out");
    Ok(())
}

/// Credential set of the signed-in user, if complete.
#[must_use]
pub fn current_session(client: &ApiClient) -> Option<SessionCredentials> {
    SessionCredentials::load(client.cookies())
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
