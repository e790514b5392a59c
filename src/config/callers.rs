use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What a listing caller does when the backend call fails.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Log the failure and hand back an empty list.
    Empty,
    /// Surface the failure to the caller.
    Fail,
}

/// Per-caller error policy for the listing endpoints.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub struct CallerPolicyConfig {
    #[serde(default = "default_sections_policy")]
    pub sections_on_error: OnError,
    #[serde(default = "default_activity_logs_policy")]
    pub activity_logs_on_error: OnError,
}

fn default_sections_policy() -> OnError {
    OnError::Empty
}

fn default_activity_logs_policy() -> OnError {
    OnError::Fail
}

impl Default for CallerPolicyConfig {
    fn default() -> Self {
        Self {
            sections_on_error: default_sections_policy(),
            activity_logs_on_error: default_activity_logs_policy(),
        }
    }
}
