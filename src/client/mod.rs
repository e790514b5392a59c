//! The authenticated HTTP client.
//!
//! Every backend call goes through [`ApiClient`]: it attaches the stored
//! access token, and on a 401 it refreshes the token once and retries the
//! original request once. A failed refresh ends the session.

mod api_client;
mod error;
mod refresh;
mod request;

pub use api_client::ApiClient;
pub use error::ClientError;
pub use refresh::REFRESH_PATH;
pub use request::{CallOptions, OutgoingRequest};
