use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Everything a call through the client core can fail with.
///
/// `Clone` because a single refresh outcome is handed to every request
/// waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The session could not be renewed: the refresh token was rejected,
    /// missing, or the refresh call itself failed.
    #[error("Authentication failed: {message}")]
    Auth {
        status: Option<StatusCode>,
        message: String,
    },

    /// No response was received.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request was cancelled")]
    Cancelled,

    /// The server answered with a non-success status.
    #[error("Server responded with {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("Failed to decode response body: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    pub(crate) fn transport(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }

    /// The HTTP status behind this error, when there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Auth { status, .. } => *status,
            _ => None,
        }
    }

    /// The message the server put in the error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// No usable response: network failure, deadline or cancellation.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Timeout(_) | ClientError::Cancelled
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display_includes_message() {
        let err = ClientError::Status {
            status: StatusCode::BAD_REQUEST,
            message: Some("identifier is required".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Server responded with 400 Bad Request: identifier is required"
        );

        let bare = ClientError::Status {
            status: StatusCode::BAD_GATEWAY,
            message: None,
        };
        assert_eq!(bare.to_string(), "Server responded with 502 Bad Gateway");
    }

    #[test]
    fn test_classification_helpers() {
        assert!(ClientError::Timeout(Duration::from_secs(1)).is_transport());
        assert!(ClientError::Cancelled.is_transport());
        assert!(!ClientError::Decode("x".into()).is_transport());

        let unauthorized = ClientError::Status {
            status: StatusCode::UNAUTHORIZED,
            message: None,
        };
        assert!(unauthorized.is_unauthorized());
        assert_eq!(unauthorized.server_message(), None);

        let auth = ClientError::Auth {
            status: Some(StatusCode::FORBIDDEN),
            message: "refresh token revoked".to_string(),
        };
        assert_eq!(auth.status(), Some(StatusCode::FORBIDDEN));
        assert!(!auth.is_unauthorized());
    }
}
