use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::callers::CallerPolicyConfig;
use super::logging::LoggingConfig;
use super::store::StorageConfig;

/// Environment variables with this prefix override the YAML file,
/// e.g. `DASHBOARD_API__BASE_URL`.
pub const ENV_PREFIX: &str = "DASHBOARD_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: backend address, token storage, caller policies and logging.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub callers: CallerPolicyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How to reach the backend.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ApiConfig {
    pub base_url: String,
    /// Deadline applied to every call that does not bring its own.
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
}

fn default_timeout_in_ms() -> u64 {
    10_000
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_in_ms: default_timeout_in_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_ms)
    }
}

/// Load config from a YAML file, then apply `DASHBOARD_*` environment overrides.
/// A missing file is fine as long as the environment supplies `api.base_url`.
pub fn load_config(path: &Path) -> Result<ConfigV1, figment::Error> {
    extract(Figment::new().merge(Yaml::file(path)))
}

/// Same as [`load_config`] but from an in-memory YAML document.
pub fn load_config_from_str(yaml: &str) -> Result<ConfigV1, figment::Error> {
    extract(Figment::new().merge(Yaml::string(yaml)))
}

fn extract(figment: Figment) -> Result<ConfigV1, figment::Error> {
    let figment = Figment::from(Serialized::default("version", "1.0.0"))
        .merge(figment)
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    // handle configuration migration between versions here when necessary
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// The JSON schema for the configuration, pretty-printed.
pub fn config_schema() -> Result<String, serde_json::Error> {
    let schema = schema_for!(Config);
    serde_json::to_string_pretty(&schema)
}
