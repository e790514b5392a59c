use serde_json::Value;
use tracing::{debug, error, warn};

use super::error::message_or;
use super::{Api, ApiError};
use crate::config::OnError;
use crate::models::{ActivityLog, NewActivity};

pub const LOG_ACTIVITY_PATH: &str = "/activity/logs";
pub const ACTIVITY_LOGS_PATH: &str = "/activity/get-logs";

impl Api {
    /// Record one audit entry. Returns the stored log as the server sent it.
    pub async fn log_activity(&self, username_id: &str, activity: &str) -> Result<Value, ApiError> {
        let body = NewActivity {
            username_id,
            activity,
        };
        let stored = self
            .client
            .post(LOG_ACTIVITY_PATH, &body)
            .await
            .map_err(|e| {
                error!(username_id, error = %e, "Failed to log activity");
                ApiError::Log(message_or(&e, "Failed to log activity."))
            })?;
        debug!(username_id, "Activity logged");
        Ok(stored)
    }

    /// All stored audit entries. Entries that do not decode are skipped.
    /// The failure message never comes from the server.
    pub async fn list_activity_logs(&self) -> Result<Vec<ActivityLog>, ApiError> {
        match self.client.get::<Option<Vec<Value>>>(ACTIVITY_LOGS_PATH).await {
            Ok(entries) => Ok(entries
                .unwrap_or_default()
                .into_iter()
                .filter_map(|entry| match serde_json::from_value::<ActivityLog>(entry) {
                    Ok(log) => Some(log),
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed activity log entry");
                        None
                    }
                })
                .collect()),
            Err(e) => {
                error!(error = %e, "Error fetching activity logs");
                match self.policy.activity_logs_on_error {
                    OnError::Empty => Ok(Vec::new()),
                    OnError::Fail => Err(ApiError::Request(
                        "Failed to fetch activity logs.".to_string(),
                    )),
                }
            }
        }
    }
}
