use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::ClientError;

/// A request as the pipeline sees it before dispatch.
///
/// Only the pipeline touches `Authorization`. The retry marker records that
/// this request already went through a refresh-triggered retry, so a second
/// 401 is final.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    retried: bool,
}

impl OutgoingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ClientError::InvalidRequest(format!("Body is not serializable: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Set `Authorization: Bearer <token>`, or drop the header when there is no token.
    pub(crate) fn authorize(&mut self, token: Option<&str>) -> Result<(), ClientError> {
        match token {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                    ClientError::InvalidRequest(
                        "Access token contains characters not allowed in a header".to_string(),
                    )
                })?;
                self.headers.insert(AUTHORIZATION, value);
            }
            None => {
                self.headers.remove(AUTHORIZATION);
            }
        }
        Ok(())
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }
}

/// Per-call deadline and cancellation.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Overrides the client's default deadline for this call.
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_sets_exact_bearer_value() {
        let mut request = OutgoingRequest::get("/activity/get-logs");
        request.authorize(Some("A1")).unwrap();
        assert_eq!(request.headers.get(AUTHORIZATION).unwrap(), "Bearer A1");

        request.authorize(Some("A2")).unwrap();
        assert_eq!(request.headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(request.headers.get(AUTHORIZATION).unwrap(), "Bearer A2");
    }

    #[test]
    fn test_authorize_without_token_leaves_no_header() {
        let mut request = OutgoingRequest::get("/activity/get-logs");
        request.authorize(Some("A1")).unwrap();
        request.authorize(None).unwrap();
        assert!(request.headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_authorize_rejects_header_breaking_tokens() {
        let mut request = OutgoingRequest::get("/x");
        let result = request.authorize(Some("A1\r\nX-Injected: yes"));
        assert!(matches!(result, Err(ClientError::InvalidRequest(_))));
    }

    #[test]
    fn test_retry_marker_starts_clear() {
        let mut request = OutgoingRequest::post("/activity/logs");
        assert!(!request.is_retried());
        request.mark_retried();
        assert!(request.is_retried());
    }

    #[test]
    fn test_json_body_is_captured() {
        let request = OutgoingRequest::post("/auth/login")
            .json(&serde_json::json!({"identifier": "alice"}))
            .unwrap();
        assert_eq!(request.body, Some(serde_json::json!({"identifier": "alice"})));
    }
}
