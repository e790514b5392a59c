use thiserror::Error;

use crate::client::ClientError;

/// A caller-level failure with a message fit to show the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Invalid credentials or an unusable session.
    #[error("{0}")]
    Auth(String),
    /// The server refused to store an activity entry.
    #[error("{0}")]
    Log(String),
    #[error("{0}")]
    Request(String),
}

impl ApiError {
    pub fn message(&self) -> &str {
        match self {
            ApiError::Auth(m) | ApiError::Log(m) | ApiError::Request(m) => m,
        }
    }
}

/// The server-supplied message when there is one, otherwise `fallback`.
pub(super) fn message_or(error: &ClientError, fallback: &str) -> String {
    error
        .server_message()
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}
