//! Network access for metadata documents.
//!
//! This module provides:
//! - A transport trait so the fetcher never talks to reqwest directly
//! - The reqwest-backed HTTP transport
//! - The cache-first fetcher

mod client;
mod fetcher;
mod transport;

pub use client::{extract_domain, HttpClient};
pub use fetcher::{FetchOrigin, Fetched, MetadataFetcher};
pub use transport::{MetadataTransport, TransportResponse};
