use std::sync::{Mutex, PoisonError};

use tracing::warn;

use super::Route;

/// How the client core asks the view layer to move somewhere else,
/// e.g. back to the login view once the session is gone.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Ignores every request.
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _route: Route) {}
}

/// Reports redirects through the log; used by the CLI.
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, route: Route) {
        match route {
            Route::Login => warn!(
                event_name = "navigation.redirect",
                route = route.path(),
                "Session ended; log in again to continue"
            ),
            other => warn!(
                event_name = "navigation.redirect",
                route = other.path(),
                "Redirecting"
            ),
        }
    }
}

/// Keeps every requested route, oldest first.
#[derive(Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Route> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Route> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }
}
