//! Per-verb loading and error state.
//!
//! DESIGN
//! ======
//! Each verb has an in-flight counter rather than a single boolean: a
//! request increments its verb's counter on start and the returned guard
//! decrements it when the request settles or its future is dropped. A verb
//! is "loading" while its counter is non-zero. The signal is still coarse:
//! it says that some request of that verb is pending, not which one.
//!
//! Error slots keep the last failure per verb (`fetch`, `post`, `put`,
//! `delete`). Starting a request clears its verb's slot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::ClientError;
use crate::request::Verb;

#[derive(Default)]
pub struct RequestTracker {
    in_flight: [AtomicUsize; 4],
    errors: Mutex<[Option<ClientError>; 4]>,
}

impl RequestTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a request of `verb` as started and clear that verb's error slot.
    pub fn start(&self, verb: Verb) -> InFlightGuard<'_> {
        self.set_error(verb, None);
        self.in_flight[verb.index()].fetch_add(1, Ordering::SeqCst);
        InFlightGuard { tracker: self, verb }
    }

    #[must_use]
    pub fn in_flight(&self, verb: Verb) -> usize {
        self.in_flight[verb.index()].load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_loading(&self, verb: Verb) -> bool {
        self.in_flight(verb) > 0
    }

    /// `true` while any request of any verb is pending.
    #[must_use]
    pub fn loading(&self) -> bool {
        Verb::ALL.into_iter().any(|verb| self.is_loading(verb))
    }

    pub fn record_error(&self, verb: Verb, error: &ClientError) {
        self.set_error(verb, Some(error.clone()));
    }

    #[must_use]
    pub fn error(&self, verb: Verb) -> Option<ClientError> {
        let errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        errors[verb.index()].clone()
    }

    /// Look up an error slot by its state key (`fetch`, `post`, `put`, `delete`).
    #[must_use]
    pub fn error_by_key(&self, key: &str) -> Option<ClientError> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.state_key() == key)
            .and_then(|verb| self.error(verb))
    }

    fn set_error(&self, verb: Verb, error: Option<ClientError>) {
        let mut errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        errors[verb.index()] = error;
    }
}

/// Decrements the verb's in-flight counter on drop.
pub struct InFlightGuard<'a> {
    tracker: &'a RequestTracker,
    verb: Verb,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.tracker.in_flight[self.verb.index()].fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "inflight_test.rs"]
mod tests;
