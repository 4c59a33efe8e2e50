//! Error types for the Places API client.
//!
//! Every variant is cheap to clone so a single failure can be delivered to
//! all callers coalesced onto the same in-flight lookup.

use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum PlacesApiError {
    #[error("Places API key is not configured")]
    MissingApiKey,
    #[error("place '{0}' not found")]
    NotFound(String),
    #[error("failed to parse response from {url} (status {status}): {cause}")]
    ParseFailed {
        status: u16,
        url: String,
        cause: Arc<anyhow::Error>,
    },
    #[error("places request failed: {0}")]
    RequestFailed(Arc<anyhow::Error>),
}

impl PlacesApiError {
    /// Wrap a transport or serialization error as a request failure.
    pub(crate) fn request(err: impl Into<anyhow::Error>) -> Self {
        Self::RequestFailed(Arc::new(err.into()))
    }

    /// Whether this error is the distinct single-entity "not found" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
