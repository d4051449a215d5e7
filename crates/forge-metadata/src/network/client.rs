//! HTTP transport backed by reqwest.
//!
//! Provides a wrapper around reqwest with:
//! - An overall per-request timeout
//! - A fixed user agent
//! - Error mapping onto [`MetadataError::RemoteFetchFailed`]

use super::transport::{MetadataTransport, TransportResponse};
use crate::config::NetworkConfig;
use crate::{MetadataError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Unauthenticated HTTP client for raw metadata documents.
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client with the default request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(NetworkConfig::REQUEST_TIMEOUT)
    }

    /// Create a client with a custom overall timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(|e| MetadataError::Config {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl MetadataTransport for HttpClient {
    async fn get(&self, url: &str) -> Result<TransportResponse> {
        debug!(host = %extract_domain(url), "GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| remote_failure(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| remote_failure(url, e))?;

        Ok(TransportResponse { status, body })
    }
}

fn remote_failure(url: &str, err: reqwest::Error) -> MetadataError {
    let cause = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    };

    MetadataError::RemoteFetchFailed {
        url: url.to_string(),
        status: None,
        cause: Some(cause),
    }
}

/// Extract domain from a URL.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.host_str().unwrap_or("unknown").to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
