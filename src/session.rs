//! Session credential set persisted in cookies.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route guards read the credential set on every protected navigation. The
//! four cookies are written together after a successful login and removed
//! together on logout; a partial set reads as "not authenticated".

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cookies::{CookieStore, EMAIL_COOKIE, ROLE_COOKIE, SESSION_ID_COOKIE, USERNAME_COOKIE};
use crate::error::CookieError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    pub username: String,
    pub session_id: String,
    pub email: String,
    pub role: String,
}

impl SessionCredentials {
    /// Read the credential set. `None` unless all four cookies are present
    /// and non-empty.
    pub fn load(store: &dyn CookieStore) -> Option<Self> {
        let read = |name: &str| store.get(name).filter(|v| !v.is_empty());
        Some(Self {
            username: read(USERNAME_COOKIE)?,
            session_id: read(SESSION_ID_COOKIE)?,
            email: read(EMAIL_COOKIE)?,
            role: read(ROLE_COOKIE)?,
        })
    }

    /// Write all four cookies.
    ///
    /// # Errors
    ///
    /// Returns the first cookie write failure.
    pub fn persist(&self, store: &dyn CookieStore) -> Result<(), CookieError> {
        store.set(USERNAME_COOKIE, &self.username)?;
        store.set(SESSION_ID_COOKIE, &self.session_id)?;
        store.set(EMAIL_COOKIE, &self.email)?;
        store.set(ROLE_COOKIE, &self.role)?;
        Ok(())
    }

    /// Remove all four cookies individually.
    ///
    /// # Errors
    ///
    /// Returns the first cookie removal failure.
    pub fn clear(store: &dyn CookieStore) -> Result<(), CookieError> {
        store.remove(USERNAME_COOKIE)?;
        store.remove(SESSION_ID_COOKIE)?;
        store.remove(EMAIL_COOKIE)?;
        store.remove(ROLE_COOKIE)?;
        Ok(())
    }

    /// Extract a complete credential set from a login, guest-login or
    /// registration response body.
    #[must_use]
    pub fn from_auth_response(body: &Value) -> Option<Self> {
        let field = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        Some(Self {
            username: field("username")?,
            session_id: field("session_id")?,
            email: field("email")?,
            role: field("role")?,
        })
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
