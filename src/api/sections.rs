use tracing::{debug, error};

use super::error::message_or;
use super::{Api, ApiError};
use crate::config::OnError;
use crate::models::Section;

pub const SECTIONS_PATH: &str = "/sections/get-sections";

impl Api {
    /// Every section with its roster. Under the default policy any failure
    /// is logged and reported as an empty list.
    pub async fn list_sections(&self) -> Result<Vec<Section>, ApiError> {
        match self.client.post_empty::<Option<Vec<Section>>>(SECTIONS_PATH).await {
            Ok(sections) => {
                let sections = sections.unwrap_or_default();
                debug!(count = sections.len(), "Fetched sections");
                Ok(sections)
            }
            Err(e) => {
                error!(error = %e, "Error fetching sections");
                match self.policy.sections_on_error {
                    OnError::Empty => Ok(Vec::new()),
                    OnError::Fail => Err(ApiError::Request(message_or(
                        &e,
                        "Failed to fetch section data.",
                    ))),
                }
            }
        }
    }
}
