use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the session tokens live. We differentiate backends via a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// Tokens survive restarts in a JSON file.
    #[serde(rename = "file")]
    File(FileStorageConfig),
    /// Tokens vanish when the process exits.
    #[serde(rename = "memory")]
    Memory,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct FileStorageConfig {
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".section-dashboard/session.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::File(FileStorageConfig {
            path: default_session_path(),
        })
    }
}
