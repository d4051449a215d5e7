//! Error types for forge-metadata.
//!
//! Resolution and matcher errors are always surfaced to the caller. Cache read
//! problems never show up here as errors: they degrade to a cache miss inside
//! the fetcher. Cache write problems after a successful fetch are logged only.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for metadata retrieval and lookup.
#[derive(Debug, Error)]
pub enum MetadataError {
    // Input errors
    #[error("Unsupported extension: {input}")]
    UnsupportedExtension { input: String },

    #[error("Unsupported search type: {kind}")]
    UnsupportedSearchType { kind: String },

    // Network errors
    #[error("Remote fetch failed for {url}: {}", describe_remote(.status, .cause))]
    RemoteFetchFailed {
        url: String,
        status: Option<u16>,
        cause: Option<String>,
    },

    #[error("Malformed payload from {url}: {message}")]
    MalformedPayload { url: String, message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for metadata operations.
pub type Result<T> = std::result::Result<T, MetadataError>;

fn describe_remote(status: &Option<u16>, cause: &Option<String>) -> String {
    match (status, cause) {
        (Some(status), _) => format!("HTTP {}", status),
        (None, Some(cause)) => cause.clone(),
        (None, None) => "unknown failure".to_string(),
    }
}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MetadataError {
    fn from(err: serde_json::Error) -> Self {
        MetadataError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl MetadataError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        MetadataError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Process exit code for the command layer.
    ///
    /// - 2: bad input (extension or search type)
    /// - 3: network or upstream payload failure
    /// - 4: local IO/serialization/configuration failure
    pub fn exit_code(&self) -> i32 {
        match self {
            MetadataError::UnsupportedExtension { .. }
            | MetadataError::UnsupportedSearchType { .. } => 2,

            MetadataError::RemoteFetchFailed { .. } | MetadataError::MalformedPayload { .. } => 3,

            MetadataError::Io { .. } | MetadataError::Json { .. } | MetadataError::Config { .. } => 4,
        }
    }

    /// Whether a caller-owned retry policy may reasonably try again.
    ///
    /// The fetcher itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            MetadataError::RemoteFetchFailed { status: None, .. } => true,
            MetadataError::RemoteFetchFailed {
                status: Some(status),
                ..
            } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}
