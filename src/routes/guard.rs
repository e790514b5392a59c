use tracing::debug;

use super::Route;
use crate::store::{SessionStore, TokenStore};

/// The guard's verdict for a protected view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Allow,
    Redirect(Route),
}

/// Gate for protected views: allowed only while an access token is stored.
/// Holds no state; every check reads the store again.
pub struct SessionGuard;

impl SessionGuard {
    pub async fn check(store: &dyn TokenStore) -> Guard {
        if store.access_token().await.is_some() {
            Guard::Allow
        } else {
            debug!("No access token in '{}' store; redirecting to login", store.get_name());
            Guard::Redirect(Route::Login)
        }
    }
}
