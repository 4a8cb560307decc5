//! Route guard for the console's routed pages
//!
//! Every page except `/login` needs a session; anonymous callers are sent
//! back to the login page.

use std::fmt;

use crate::auth::Session;

/// Path of the login page
pub const LOGIN_PATH: &str = "/login";

/// Console pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
    Dccu,
    ControlCenter,
    OpsBoard,
    Vault,
    Monitor,
    Creator,
}

impl Route {
    pub const ALL: [Route; 8] = [
        Route::Login,
        Route::Dashboard,
        Route::Dccu,
        Route::ControlCenter,
        Route::OpsBoard,
        Route::Vault,
        Route::Monitor,
        Route::Creator,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => LOGIN_PATH,
            Route::Dashboard => "/",
            Route::Dccu => "/dccu",
            Route::ControlCenter => "/control",
            Route::OpsBoard => "/ops",
            Route::Vault => "/vault",
            Route::Monitor => "/monitor",
            Route::Creator => "/creator",
        }
    }

    /// Match a request path, ignoring a trailing slash and query string
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Route::ALL.into_iter().find(|route| route.path() == path)
    }

    pub fn requires_session(self) -> bool {
        self != Route::Login
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of guarding a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Render(Route),
    RedirectToLogin,
    NotFound,
}

/// Decide what a navigation to `path` shows
pub fn guard(path: &str, session: Option<&Session>) -> RouteDecision {
    match Route::from_path(path) {
        None => RouteDecision::NotFound,
        Some(route) if route.requires_session() && session.is_none() => {
            RouteDecision::RedirectToLogin
        }
        Some(route) => RouteDecision::Render(route),
    }
}
