//! Transport seam between the fetcher and the network.
//!
//! Production code uses [`HttpClient`](super::HttpClient); tests substitute an
//! in-memory implementation so no request ever leaves the process.

use crate::Result;
use async_trait::async_trait;

/// Status and body of a completed GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Read-only document transport.
///
/// Implementations report connection-level failures as
/// [`MetadataError::RemoteFetchFailed`](crate::MetadataError::RemoteFetchFailed)
/// without a status. Any response that arrives, whatever its status, is
/// returned as `Ok` so the caller can decide.
#[async_trait]
pub trait MetadataTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse>;
}
