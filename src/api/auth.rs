use serde::Serialize;
use tracing::{info, warn};

use super::error::message_or;
use super::{Api, ApiError};
use crate::models::Session;
use crate::routes::Route;
use crate::store::SessionStore;

pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";

#[derive(Serialize)]
struct LoginRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

impl Api {
    /// Exchange credentials for a session and persist both tokens.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<Session, ApiError> {
        let session: Session = self
            .client
            .post(LOGIN_PATH, &LoginRequest { identifier, password })
            .await
            .map_err(|e| {
                warn!(identifier, error = %e, "Login failed");
                ApiError::Auth(message_or(&e, "Login failed"))
            })?;

        self.client.store().save_session(&session).await;
        info!(identifier, "Logged in");
        Ok(session)
    }

    /// Tell the backend, then forget the session locally whatever it said.
    pub async fn logout(&self) {
        if let Err(e) = self.client.post_empty::<serde_json::Value>(LOGOUT_PATH).await {
            warn!(error = %e, "Backend logout failed; clearing the local session anyway");
        }
        self.client.store().clear_session().await;
        self.client.navigator().navigate(Route::Login);
        info!("Logged out");
    }
}
