//! Application startup.
//!
//! Builds the token store from configuration and wires the client core and
//! the API callers on top of it.

use std::sync::Arc;
use tracing::info;

use crate::api::Api;
use crate::client::{ApiClient, ClientError};
use crate::config::ConfigV1;
use crate::routes::Navigator;
use crate::state::AppState;
use crate::store::create_store;

/// Initializes the application state.
///
/// # Errors
///
/// Returns an error if the configured base URL is invalid or the HTTP
/// client cannot be constructed.
pub async fn build_state(
    config: Arc<ConfigV1>,
    navigator: Arc<dyn Navigator>,
) -> Result<AppState, ClientError> {
    let store = create_store(&config.storage).await;
    let client = ApiClient::new(&config.api, store.clone(), navigator)?;
    let api = Api::new(client.clone(), config.callers);

    info!(
        "Client ready for '{}' (persistent session: {})",
        client.base_url(),
        store.is_persistent()
    );

    Ok(AppState {
        config,
        store,
        client,
        api,
    })
}
