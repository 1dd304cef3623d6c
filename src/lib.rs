//! Authenticated REST client for the agent chat and administration backend.
//!
//! Every request goes through [`ApiClient`], which attaches the cached CSRF
//! token and session id, picks the body encoding, applies the default
//! timeout, and tracks per-verb loading and error state. The token and the
//! session credential set live in a [`cookies::CookieStore`] so they survive
//! a restart.

pub mod auth;
pub mod auth_route;
pub mod client;
pub mod config;
pub mod cookies;
pub mod error;
pub mod inflight;
pub mod request;
pub mod session;
pub mod token;
pub mod transport;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, ErrorCode};
pub use request::{Body, MultipartForm, RequestConfig, Verb};
pub use session::SessionCredentials;
