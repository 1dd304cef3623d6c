//! Cookie storage for session identity and the CSRF token.
//!
//! DESIGN
//! ======
//! The browser cookie jar is modelled as a small name/value store. The
//! in-memory backend behaves like session cookies; the file backend keeps a
//! JSON map on disk so a fresh process can rehydrate the same values, the
//! way a page reload reads cookies back.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::CookieError;

pub const CSRF_TOKEN_COOKIE: &str = "csrf-token";
pub const SESSION_ID_COOKIE: &str = "session_id";
pub const USERNAME_COOKIE: &str = "userName";
pub const EMAIL_COOKIE: &str = "email";
pub const ROLE_COOKIE: &str = "role";

/// Get/set/remove by cookie name. Values are plain strings with no expiry.
pub trait CookieStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns an error if a persistent backend cannot write the change.
    fn set(&self, name: &str, value: &str) -> Result<(), CookieError>;

    /// # Errors
    ///
    /// Returns an error if a persistent backend cannot write the change.
    fn remove(&self, name: &str) -> Result<(), CookieError>;
}

// =============================================================================
// MEMORY
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookies: Mutex<BTreeMap<String, String>>,
}

impl MemoryCookieStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        let cookies = self.cookies.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        cookies.get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) -> Result<(), CookieError> {
        let mut cookies = self.cookies.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        cookies.insert(name.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), CookieError> {
        let mut cookies = self.cookies.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        cookies.remove(name);
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// JSON-file cookie jar. Every mutation atomically replaces the whole file.
#[derive(Debug)]
pub struct FileCookieStore {
    path: PathBuf,
    cookies: Mutex<BTreeMap<String, String>>,
}

impl FileCookieStore {
    /// Open the jar at `path`. A missing file opens as an empty jar.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CookieError> {
        let path = path.into();
        let cookies = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, cookies: Mutex::new(cookies) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the jar to a temp file beside it and rename it into place, so a
    /// crash mid-write never leaves a truncated jar behind.
    fn flush(&self, cookies: &BTreeMap<String, String>) -> Result<(), CookieError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_vec_pretty(cookies)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl CookieStore for FileCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        let cookies = self.cookies.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        cookies.get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) -> Result<(), CookieError> {
        let mut cookies = self.cookies.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        cookies.insert(name.to_owned(), value.to_owned());
        self.flush(&cookies)
    }

    fn remove(&self, name: &str) -> Result<(), CookieError> {
        let mut cookies = self.cookies.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if cookies.remove(name).is_none() {
            return Ok(());
        }
        self.flush(&cookies)
    }
}

#[cfg(test)]
#[path = "cookies_test.rs"]
mod tests;
