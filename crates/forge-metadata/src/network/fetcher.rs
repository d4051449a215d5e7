//! Cache-first retrieval of metadata documents.
//!
//! Order of operations for one request:
//! 1. Resolve the extension (unsupported names fail before any IO)
//! 2. Serve the cache entry if it is within the freshness window
//! 3. Otherwise fetch `{org}/{repo}/refs/heads/{branch}/metadata/{kind}s.json`
//! 4. Write the parsed document through to the cache (best effort)
//!
//! Stale entries are never served as a fallback: a failed fetch is an error.
//! Concurrent fetches of the same key are not deduplicated; the last cache
//! write wins.

use crate::cache::{is_fresh, MetadataCache};
use crate::context::MetadataContext;
use crate::models::{CacheKey, CacheLookup, CacheScope, ObjectCollection, ObjectKind};
use crate::sources::{self, SourceDescriptor};
use crate::{MetadataError, Result};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

/// Where a fetched collection came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FetchOrigin {
    Cache { scope: CacheScope, age_seconds: u64 },
    Remote { url: String },
}

/// A collection together with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched {
    pub collection: ObjectCollection,
    pub origin: FetchOrigin,
}

/// Cache-first metadata fetcher.
pub struct MetadataFetcher {
    context: MetadataContext,
    cache: MetadataCache,
}

impl MetadataFetcher {
    pub fn new(context: MetadataContext) -> Self {
        let cache = MetadataCache::new(context.roots().clone(), context.clock().clone());
        Self { context, cache }
    }

    /// Fetcher with production defaults: home/current-directory roots, HTTP
    /// transport, system clock, user scope.
    pub fn from_environment() -> Result<Self> {
        Ok(Self::new(MetadataContext::builder().build()?))
    }

    pub fn context(&self) -> &MetadataContext {
        &self.context
    }

    /// The cache this fetcher reads from and writes to.
    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Fetch one document, from cache when fresh.
    pub async fn fetch(
        &self,
        kind: ObjectKind,
        extension: &str,
        use_dev_branch: bool,
        force_refresh: bool,
    ) -> Result<ObjectCollection> {
        self.fetch_detailed(kind, extension, use_dev_branch, force_refresh)
            .await
            .map(|fetched| fetched.collection)
    }

    /// Like [`MetadataFetcher::fetch`], also reporting where the data came from.
    pub async fn fetch_detailed(
        &self,
        kind: ObjectKind,
        extension: &str,
        use_dev_branch: bool,
        force_refresh: bool,
    ) -> Result<Fetched> {
        let source = sources::resolve(extension, use_dev_branch)?;
        let key = CacheKey::for_object(&source.extension_key, kind)?;
        let scope = self.context.config().scope;

        if force_refresh {
            debug!(key = %key, scope = %scope, "Forced refresh, skipping cache");
        } else if let Some(fetched) = self.fresh_from_cache(scope, &key, kind) {
            return Ok(fetched);
        }

        let url = self.remote_url(&source, kind)?;
        let collection = self.fetch_remote(&url, kind).await?;

        match self.cache.write(scope, &key, &collection) {
            Ok(_) => debug!(key = %key, scope = %scope, "Cache updated"),
            Err(e) => warn!(key = %key, scope = %scope, "Failed to write cache: {}", e),
        }

        Ok(Fetched {
            collection,
            origin: FetchOrigin::Remote { url },
        })
    }

    /// Fetch functions, events and enums for one extension concurrently.
    ///
    /// Results are in [`ObjectKind::ALL`] order. The first error is returned.
    pub async fn fetch_all(
        &self,
        extension: &str,
        use_dev_branch: bool,
        force_refresh: bool,
    ) -> Result<Vec<(ObjectKind, ObjectCollection)>> {
        // Fail on an unknown extension once, not three times.
        sources::resolve(extension, use_dev_branch)?;

        let fetches = ObjectKind::ALL.into_iter().map(|kind| async move {
            self.fetch(kind, extension, use_dev_branch, force_refresh)
                .await
                .map(|collection| (kind, collection))
        });

        try_join_all(fetches).await
    }

    /// Remote document URL for `source` and `kind`.
    pub fn remote_url(&self, source: &SourceDescriptor, kind: ObjectKind) -> Result<String> {
        let config = self.context.config();
        let mut url = Url::parse(&config.raw_base_url).map_err(|e| MetadataError::Config {
            message: format!("Invalid raw base URL {}: {}", config.raw_base_url, e),
        })?;

        url.path_segments_mut()
            .map_err(|_| MetadataError::Config {
                message: format!("Raw base URL cannot have a path: {}", config.raw_base_url),
            })?
            .pop_if_empty()
            .extend([
                config.organization.as_str(),
                source.repository_id.as_str(),
                "refs",
                "heads",
                source.branch.as_str(),
                "metadata",
                &kind.document_name(),
            ]);

        Ok(url.to_string())
    }

    // Internal methods

    fn fresh_from_cache(&self, scope: CacheScope, key: &CacheKey, kind: ObjectKind) -> Option<Fetched> {
        let entry = match self.cache.lookup_collection(scope, key, kind) {
            CacheLookup::Found(entry) => entry,
            CacheLookup::NotFound => {
                debug!(key = %key, scope = %scope, "Cache miss");
                return None;
            }
            CacheLookup::Unreadable { path, reason } => {
                warn!(path = %path.display(), %reason, "Ignoring unreadable {} cache entry", kind);
                return None;
            }
        };

        let now = self.context.clock().now();
        let window = self.context.config().freshness_window;
        let age_seconds = entry.age(now).num_seconds().max(0) as u64;

        if !is_fresh(entry.updated_at, now, window) {
            debug!(key = %key, scope = %scope, age_secs = age_seconds, "Cache stale");
            return None;
        }

        debug!(key = %key, scope = %scope, age_secs = age_seconds, "Cache hit");
        Some(Fetched {
            collection: entry.payload,
            origin: FetchOrigin::Cache { scope, age_seconds },
        })
    }

    async fn fetch_remote(&self, url: &str, kind: ObjectKind) -> Result<ObjectCollection> {
        let timeout = self.context.config().request_timeout;
        debug!(url = %url, "Fetching remote metadata");

        let response = tokio::time::timeout(timeout, self.context.transport().get(url))
            .await
            .map_err(|_| MetadataError::RemoteFetchFailed {
                url: url.to_string(),
                status: None,
                cause: Some(format!("timed out after {}s", timeout.as_secs_f64())),
            })??;

        if !response.is_success() {
            return Err(MetadataError::RemoteFetchFailed {
                url: url.to_string(),
                status: Some(response.status),
                cause: None,
            });
        }

        let collection =
            ObjectCollection::from_json_str(kind, &response.body).map_err(|e| MetadataError::MalformedPayload {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        info!(url = %url, count = collection.len(), "Fetched {} metadata", kind);
        Ok(collection)
    }
}
