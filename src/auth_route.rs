//! Auth endpoints whose responses carry a CSRF token.
//!
//! Paths are compared exactly after dropping the query string, fragment and
//! a trailing `/`, so `/login_history` or `/admin/login` never match.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRoute {
    Login,
    LoginGuest,
    Registration,
}

impl AuthRoute {
    pub const ALL: [Self; 3] = [Self::Login, Self::LoginGuest, Self::Registration];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::LoginGuest => "/login_guest",
            Self::Registration => "/registration",
        }
    }

    /// Resolve a request path to an auth route, if it is one.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = path.trim_end_matches('/');
        let path = path.strip_prefix('/').unwrap_or(path);
        Self::ALL.into_iter().find(|route| &route.path()[1..] == path)
    }
}

#[cfg(test)]
#[path = "auth_route_test.rs"]
mod tests;
