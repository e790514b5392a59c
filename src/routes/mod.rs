//! View routes, the session guard, and the navigator port.
//!
//! The view layer owns rendering; this module only decides which view a
//! path leads to given the current token state.

mod guard;
mod navigator;

pub use guard::{Guard, SessionGuard};
pub use navigator::{LoggingNavigator, Navigator, NoopNavigator, RecordingNavigator};

use std::fmt;

use tracing::debug;

use crate::store::{SessionStore, TokenStore};

/// A view the client can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    NotFound(String),
}

impl Route {
    pub const LOGIN_PATH: &'static str = "/login";
    pub const DASHBOARD_PATH: &'static str = "/dashboard";

    /// Map a path to a route. Trailing slashes are ignored.
    pub fn parse(path: &str) -> Route {
        match normalize(path) {
            Self::LOGIN_PATH => Route::Login,
            Self::DASHBOARD_PATH => Route::Dashboard,
            other => Route::NotFound(other.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Login => Self::LOGIN_PATH,
            Route::Dashboard => Self::DASHBOARD_PATH,
            Route::NotFound(path) => path,
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// The outcome of navigating to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim();
    match trimmed.trim_end_matches('/') {
        "" => "/",
        p => p,
    }
}

/// Decide what navigating to `path` shows, evaluated fresh on every call.
///
/// - `/` redirects to the login view.
/// - `/login` redirects to the dashboard when an access token is already present.
/// - `/dashboard` is guarded by [`SessionGuard`].
/// - anything else renders the not-found view.
pub async fn resolve(path: &str, store: &dyn TokenStore) -> Navigation {
    if normalize(path) == "/" {
        return Navigation::Redirect(Route::Login);
    }

    let navigation = match Route::parse(path) {
        Route::Login => {
            if store.access_token().await.is_some() {
                Navigation::Redirect(Route::Dashboard)
            } else {
                Navigation::Render(Route::Login)
            }
        }
        route if route.is_protected() => match SessionGuard::check(store).await {
            Guard::Allow => Navigation::Render(route),
            Guard::Redirect(target) => Navigation::Redirect(target),
        },
        route => Navigation::Render(route),
    };

    debug!("Resolved '{}' to {:?}", path, navigation);
    navigation
}
