//! Data models for forge-metadata.
//!
//! `metadata` mirrors the documents extension repositories publish; `cache`
//! holds the types the cache store hands back.

mod cache;
mod metadata;

pub use cache::*;
pub use metadata::*;
