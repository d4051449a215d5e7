//! Forge Metadata - cache-first retrieval and lookup of extension metadata.
//!
//! Extension repositories publish `functions.json`, `events.json` and
//! `enums.json` documents. This crate resolves an extension name to its
//! repository, serves the documents from an on-disk cache while they are
//! fresh, fetches them otherwise, and finds individual records by name.
//!
//! # Example
//!
//! ```rust,ignore
//! use forge_metadata::{find, MetadataFetcher, ObjectKind};
//!
//! #[tokio::main]
//! async fn main() -> forge_metadata::Result<()> {
//!     let fetcher = MetadataFetcher::from_environment()?;
//!
//!     let functions = fetcher.fetch(ObjectKind::Function, "forgescript", false, false).await?;
//!     if let Some(record) = find(ObjectKind::Function, &functions, "sendMessage")? {
//!         println!("{}", record.name());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod matcher;
pub mod models;
pub mod network;
pub mod sources;

// Re-export commonly used types
pub use cache::{is_fresh, MetadataCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{MetadataConfig, ScopeRoots};
pub use context::{MetadataContext, MetadataContextBuilder};
pub use error::{MetadataError, Result};
pub use matcher::{find, find_or, MatchedRecord, FUNCTION_SIGIL};
pub use models::{
    CacheEntry, CacheKey, CacheLookup, CacheScope, CacheStatus, EnumDefinition, EnumTable, EventRecord,
    FunctionRecord, ObjectCollection, ObjectKind,
};
pub use network::{FetchOrigin, Fetched, HttpClient, MetadataFetcher, MetadataTransport, TransportResponse};
pub use sources::{resolve, Branch, Extension, SourceDescriptor};
