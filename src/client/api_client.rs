use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::refresh::InFlightRefresh;
use super::{CallOptions, ClientError, OutgoingRequest};
use crate::config::ApiConfig;
use crate::routes::{Navigator, Route};
use crate::store::{SessionStore, TokenStore};
use crate::utils::value::server_message;

/// The single refresh every concurrent 401 observer waits on.
pub(super) type SharedRefresh = Shared<BoxFuture<'static, Result<String, ClientError>>>;

/// The authenticated backend client. Cloning is cheap and clones share the
/// token store, the navigator and the in-flight refresh.
#[derive(Clone)]
pub struct ApiClient {
    pub(super) inner: Arc<ClientInner>,
}

pub(super) struct ClientInner {
    pub(super) http: reqwest::Client,
    pub(super) base_url: String,
    pub(super) timeout: Duration,
    pub(super) store: Arc<dyn TokenStore>,
    pub(super) navigator: Arc<dyn Navigator>,
    pub(super) in_flight_refresh: Mutex<Option<InFlightRefresh>>,
    pub(super) refresh_generation: AtomicU64,
}

/// Status and body of a dispatched request.
pub(super) struct RawResponse {
    pub(super) status: StatusCode,
    pub(super) body: Vec<u8>,
}

impl RawResponse {
    fn into_result(self) -> Result<Self, ClientError> {
        if self.status.is_success() {
            return Ok(self);
        }
        Err(ClientError::Status {
            status: self.status,
            message: server_message(&self.body),
        })
    }

    /// An empty body decodes as JSON `null`, which suits `()` and `Option<_>`.
    fn decode<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        let decoded = if self.body.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_value(Value::Null)
        } else {
            serde_json::from_slice(&self.body)
        };
        decoded.map_err(|e| ClientError::Decode(e.to_string()))
    }
}

impl ApiClient {
    pub fn new(
        config: &ApiConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|e| {
            ClientError::InvalidRequest(format!("Invalid api.base_url '{}': {}", config.base_url, e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::InvalidRequest(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "Creating API client for '{}' with '{}' token store",
            base_url,
            store.get_name()
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: config.timeout(),
                store,
                navigator,
                in_flight_refresh: Mutex::new(None),
                refresh_generation: AtomicU64::new(0),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(OutgoingRequest::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(OutgoingRequest::post(path).json(body)?).await
    }

    /// POST without a body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(OutgoingRequest::post(path)).await
    }

    pub async fn send<T: DeserializeOwned>(&self, request: OutgoingRequest) -> Result<T, ClientError> {
        self.send_with(request, CallOptions::default()).await
    }

    /// Run a request through the full pipeline under the given deadline and
    /// cancellation token, then decode the JSON body.
    ///
    /// The deadline covers the whole call: the first attempt, a refresh the
    /// call has to wait for, and the retry.
    pub async fn send_with<T: DeserializeOwned>(
        &self,
        request: OutgoingRequest,
        options: CallOptions,
    ) -> Result<T, ClientError> {
        let span = info_span!(
            "api_call",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            path = %request.path,
        );

        async move {
            let response = self.run_with_deadline(request, &options).await?;
            response.decode()
        }
        .instrument(span)
        .await
    }

    async fn run_with_deadline(
        &self,
        request: OutgoingRequest,
        options: &CallOptions,
    ) -> Result<RawResponse, ClientError> {
        let deadline = options.timeout.unwrap_or(self.inner.timeout);
        let call = tokio::time::timeout(deadline, self.execute(request));

        let outcome = match &options.cancel {
            Some(cancel) => tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(event_name = "client.request.cancelled", "Request cancelled by caller");
                    return Err(ClientError::Cancelled);
                }
                outcome = call => outcome,
            },
            None => call.await,
        };

        outcome.unwrap_or_else(|_| {
            warn!(
                event_name = "client.request.timeout",
                timeout_ms = deadline.as_millis() as u64,
                "Request deadline exceeded"
            );
            Err(ClientError::Timeout(deadline))
        })
    }

    /// Request pipeline followed by the response pipeline.
    async fn execute(&self, mut request: OutgoingRequest) -> Result<RawResponse, ClientError> {
        // Read at call time: the token may have changed since the last call.
        let access_token = self.inner.store.access_token().await;
        if access_token.is_none() {
            debug!("No access token stored; sending unauthenticated");
        }
        request.authorize(access_token.as_deref())?;

        let response = self.inner.dispatch(&request).await?;
        if response.status != StatusCode::UNAUTHORIZED || request.is_retried() {
            return response.into_result();
        }

        // Set before refreshing so the retried request can never trigger another refresh.
        request.mark_retried();

        let Some(refresh_token) = self.inner.store.refresh_token().await else {
            warn!(
                event_name = "client.refresh.skipped",
                event_domain = "client",
                "Received 401 and no refresh token is stored; ending session"
            );
            self.inner.end_session().await;
            return response.into_result();
        };

        let access_token = self.inner.refresh(refresh_token).await?;
        request.authorize(Some(&access_token))?;

        debug!("Retrying request once with the refreshed access token");
        self.inner.dispatch(&request).await?.into_result()
    }
}

impl ClientInner {
    pub(super) fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub(super) async fn dispatch(&self, request: &OutgoingRequest) -> Result<RawResponse, ClientError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path))
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(
            retried = request.is_retried(),
            "Dispatching {} {}",
            request.method,
            request.path
        );
        let response = builder.send().await.map_err(ClientError::transport)?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(ClientError::transport)?
            .to_vec();
        debug!(status = status.as_u16(), "Received response");

        Ok(RawResponse { status, body })
    }

    /// Drop both tokens and send the view layer back to the login view.
    pub(super) async fn end_session(&self) {
        self.store.clear_session().await;
        self.navigator.navigate(Route::Login);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::NoopNavigator;
    use crate::store::MemoryTokenStore;

    fn client(base_url: &str) -> Result<ApiClient, ClientError> {
        ApiClient::new(
            &ApiConfig::new(base_url),
            Arc::new(MemoryTokenStore::new()),
            Arc::new(NoopNavigator),
        )
    }

    #[test]
    fn test_url_joins_paths_without_double_slashes() {
        let client = client("http://backend.local:5000/").unwrap();
        assert_eq!(client.base_url(), "http://backend.local:5000");
        assert_eq!(
            client.inner.url("/auth/login"),
            "http://backend.local:5000/auth/login"
        );
        assert_eq!(
            client.inner.url("auth/login"),
            "http://backend.local:5000/auth/login"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            client("not a url"),
            Err(ClientError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_empty_body_decodes_to_unit_and_none() {
        let empty = || RawResponse {
            status: StatusCode::OK,
            body: Vec::new(),
        };
        assert!(empty().decode::<()>().is_ok());
        assert_eq!(empty().decode::<Option<Vec<u8>>>().unwrap(), None);
        assert!(matches!(
            empty().decode::<Vec<u8>>(),
            Err(ClientError::Decode(_))
        ));
    }

    #[test]
    fn test_error_status_carries_server_message() {
        let response = RawResponse {
            status: StatusCode::FORBIDDEN,
            body: br#"{"message": "Not your section"}"#.to_vec(),
        };
        assert_eq!(
            response.into_result().err(),
            Some(ClientError::Status {
                status: StatusCode::FORBIDDEN,
                message: Some("Not your section".to_string()),
            })
        );
    }
}
