//! Shared application state.
//!
//! Everything a command needs: the configuration, the token store, and
//! the API callers built over the client core.

use crate::api::Api;
use crate::client::ApiClient;
use crate::config::ConfigV1;
use crate::store::TokenStore;
use std::sync::Arc;

/// Application state handed to every command.
///
/// Cloning is cheap; clones share the store and the client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Where the session tokens are kept.
    pub store: Arc<dyn TokenStore>,
    /// The authenticated client core.
    pub client: ApiClient,
    /// Typed callers over `client`.
    pub api: Api,
}
