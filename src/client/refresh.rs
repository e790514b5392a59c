use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};

use futures::FutureExt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::api_client::{ApiClient, ClientInner, SharedRefresh};
use super::ClientError;
use crate::store::SessionStore;
use crate::utils::value::server_message;

/// Where a refresh token is exchanged for a new access token.
pub const REFRESH_PATH: &str = "/api/refresh-token";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Only the access token is taken from the response; the refresh token is never rotated.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

fn refresh_failure(status: Option<StatusCode>, message: impl Into<String>) -> ClientError {
    ClientError::Auth {
        status,
        message: message.into(),
    }
}

impl ApiClient {
    /// Exchange the stored refresh token for a new access token, joining a
    /// refresh that is already in flight if there is one.
    ///
    /// Without a stored refresh token the session is ended right away.
    pub async fn refresh_session(&self) -> Result<String, ClientError> {
        let Some(refresh_token) = self.inner.store.refresh_token().await else {
            self.inner.end_session().await;
            return Err(refresh_failure(None, "No refresh token is stored"));
        };
        self.inner.refresh(refresh_token).await
    }
}

/// The refresh currently running, keyed by the refresh token it was started with.
pub(super) struct InFlightRefresh {
    generation: u64,
    refresh_token: String,
    outcome: SharedRefresh,
}

impl ClientInner {
    /// At most one refresh call is outstanding per refresh token; everyone who
    /// observes a 401 meanwhile awaits the same outcome.
    ///
    /// The exchange runs on its own task, so a waiter that times out or is
    /// cancelled never leaves a half-run refresh behind. The task clears the
    /// slot itself once it is done.
    pub(super) async fn refresh(self: &Arc<Self>, refresh_token: String) -> Result<String, ClientError> {
        let outcome = {
            let mut slot = self
                .in_flight_refresh
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let joined = slot
                .as_ref()
                .filter(|in_flight| in_flight.refresh_token == refresh_token)
                .map(|in_flight| in_flight.outcome.clone());

            match joined {
                Some(outcome) => {
                    debug!("Joining the token refresh already in flight");
                    outcome
                }
                None => {
                    let generation = self.refresh_generation.fetch_add(1, Ordering::Relaxed);
                    let inner = Arc::clone(self);
                    let token = refresh_token.clone();
                    let task = tokio::spawn(async move {
                        let outcome = inner.renew_access_token(&token).await;
                        inner.finish_refresh(generation);
                        outcome
                    });
                    let outcome: SharedRefresh = async move {
                        task.await.unwrap_or_else(|e| {
                            Err(refresh_failure(None, format!("Token refresh task failed: {}", e)))
                        })
                    }
                    .boxed()
                    .shared();

                    *slot = Some(InFlightRefresh {
                        generation,
                        refresh_token,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
            }
        };

        outcome.await
    }

    /// Empty the slot unless a newer refresh has already taken it.
    fn finish_refresh(&self, generation: u64) {
        let mut slot = self
            .in_flight_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == generation)
        {
            *slot = None;
        }
    }

    /// Whether `refresh_token` is still the one in the store. A refresh that
    /// outlived its session (logout, or a new login) must not touch the new one.
    async fn is_current(&self, refresh_token: &str) -> bool {
        self.store.refresh_token().await.as_deref() == Some(refresh_token)
    }

    /// One refresh attempt. On failure the session it started from is ended
    /// once, no matter how many requests are waiting on it.
    async fn renew_access_token(&self, refresh_token: &str) -> Result<String, ClientError> {
        info!(
            event_name = "client.refresh.start",
            event_domain = "client",
            "Access token rejected; refreshing"
        );

        match self.call_refresh_endpoint(refresh_token).await {
            Ok(access_token) => {
                if self.is_current(refresh_token).await {
                    self.store.set_access_token(&access_token).await;
                    info!(
                        event_name = "client.refresh.success",
                        event_domain = "client",
                        "Access token refreshed"
                    );
                } else {
                    debug!("Session changed during refresh; new access token not stored");
                }
                Ok(access_token)
            }
            Err(e) => {
                if self.is_current(refresh_token).await {
                    warn!(
                        event_name = "client.refresh.failure",
                        event_domain = "client",
                        error = %e,
                        "Token refresh failed; ending session"
                    );
                    self.end_session().await;
                } else {
                    debug!(error = %e, "Stale token refresh failed; session left alone");
                }
                Err(e)
            }
        }
    }

    /// The refresh call bypasses the pipeline: no bearer header, no 401 handling.
    async fn call_refresh_endpoint(&self, refresh_token: &str) -> Result<String, ClientError> {
        let exchange = async {
            let response = self
                .http
                .post(self.url(REFRESH_PATH))
                .json(&RefreshRequest { refresh_token })
                .send()
                .await
                .map_err(|e| refresh_failure(None, format!("Token refresh request failed: {}", e)))?;

            let status = response.status();
            let body = response.bytes().await.map_err(|e| {
                refresh_failure(
                    Some(status),
                    format!("Failed to read token refresh response: {}", e),
                )
            })?;
            Ok::<_, ClientError>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                refresh_failure(
                    None,
                    format!("Token refresh timed out after {:?}", self.timeout),
                )
            })??;

        if !status.is_success() {
            let message = server_message(&body)
                .unwrap_or_else(|| "Session expired, please log in again".to_string());
            return Err(refresh_failure(Some(status), message));
        }

        let parsed: RefreshResponse = serde_json::from_slice(&body).map_err(|e| {
            refresh_failure(
                Some(status),
                format!("Token refresh response has no access token: {}", e),
            )
        })?;
        Ok(parsed.access_token)
    }
}
