//! Typed wrappers over [`ApiClient`], one per backend operation.
//!
//! Each caller has a fixed method, path and body shape and reports failures
//! as a single human-readable [`ApiError`].

mod activity;
mod auth;
mod error;
mod sections;

pub use activity::{ACTIVITY_LOGS_PATH, LOG_ACTIVITY_PATH};
pub use auth::{LOGIN_PATH, LOGOUT_PATH};
pub use error::ApiError;
pub use sections::SECTIONS_PATH;

use crate::client::ApiClient;
use crate::config::CallerPolicyConfig;

#[derive(Clone)]
pub struct Api {
    client: ApiClient,
    policy: CallerPolicyConfig,
}

impl Api {
    pub fn new(client: ApiClient, policy: CallerPolicyConfig) -> Self {
        Self { client, policy }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn policy(&self) -> &CallerPolicyConfig {
        &self.policy
    }
}
