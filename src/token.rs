//! CSRF token and session id cache.
//!
//! DESIGN
//! ======
//! Two states: `NoToken` and `TokenCached`. The token enters the cache from
//! a login, guest-login or registration response and leaves only through
//! [`TokenCache::clear_token`]. Reads go to memory first and fall through to
//! the cookie store, populating memory on a hit, so a fresh process picks up
//! the token persisted by an earlier one.
//!
//! The session id follows the same read-through pattern. The client writes
//! its cookie from auth responses; the cache never sets it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cookies::{CSRF_TOKEN_COOKIE, CookieStore, SESSION_ID_COOKIE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    NoToken,
    TokenCached,
}

#[derive(Default)]
struct Memory {
    token: Option<String>,
    session_id: Option<String>,
}

pub struct TokenCache {
    memory: Mutex<Memory>,
    store: Arc<dyn CookieStore>,
}

impl TokenCache {
    #[must_use]
    pub fn new(store: Arc<dyn CookieStore>) -> Self {
        Self { memory: Mutex::new(Memory::default()), store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CookieStore> {
        &self.store
    }

    /// Current token, rehydrating memory from the cookie when empty.
    pub fn token(&self) -> Option<String> {
        if let Some(token) = self.memory().token.clone() {
            return Some(token);
        }
        // The cookie store is read without the memory lock held.
        let cookie = self.store.get(CSRF_TOKEN_COOKIE).filter(|t| !t.is_empty())?;
        Some(self.memory().token.get_or_insert(cookie).clone())
    }

    /// Current session id, rehydrating memory from the cookie when empty.
    pub fn session_id(&self) -> Option<String> {
        if let Some(session_id) = self.memory().session_id.clone() {
            return Some(session_id);
        }
        let cookie = self.store.get(SESSION_ID_COOKIE).filter(|s| !s.is_empty())?;
        Some(self.memory().session_id.get_or_insert(cookie).clone())
    }

    fn memory(&self) -> MutexGuard<'_, Memory> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cache `token` in memory and mirror it into the `csrf-token` cookie.
    /// Empty tokens are ignored.
    pub fn set_token(&self, token: &str) {
        if token.is_empty() {
            return;
        }
        self.memory().token = Some(token.to_owned());
        if let Err(e) = self.store.set(CSRF_TOKEN_COOKIE, token) {
            tracing::warn!(error = %e, "failed to persist csrf token cookie");
        }
        tracing::info!("csrf token cached");
    }

    /// Drop the cached token and session id and delete the `csrf-token` cookie.
    pub fn clear_token(&self) {
        {
            let mut memory = self.memory();
            memory.token = None;
            memory.session_id = None;
        }
        if let Err(e) = self.store.remove(CSRF_TOKEN_COOKIE) {
            tracing::warn!(error = %e, "failed to remove csrf token cookie");
        }
        tracing::info!("csrf token cleared");
    }

    /// Drop the in-memory session id so the next read goes back to the cookie.
    pub(crate) fn forget_session_id(&self) {
        self.memory().session_id = None;
    }

    pub fn state(&self) -> TokenState {
        if self.token().is_some() { TokenState::TokenCached } else { TokenState::NoToken }
    }
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
