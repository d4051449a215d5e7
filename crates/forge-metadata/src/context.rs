//! Explicit context passed to every metadata operation.
//!
//! Holds the scope roots, runtime configuration, transport and clock. Nothing
//! in the crate reads these from globals, so tests can swap in a fake
//! transport and a manual clock.

use crate::clock::{Clock, SystemClock};
use crate::config::{MetadataConfig, ScopeRoots};
use crate::models::CacheScope;
use crate::network::{HttpClient, MetadataTransport};
use crate::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Configuration and collaborators shared by the fetcher and cache.
#[derive(Clone)]
pub struct MetadataContext {
    config: MetadataConfig,
    roots: ScopeRoots,
    transport: Arc<dyn MetadataTransport>,
    clock: Arc<dyn Clock>,
}

impl MetadataContext {
    pub fn builder() -> MetadataContextBuilder {
        MetadataContextBuilder::new()
    }

    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }

    pub fn roots(&self) -> &ScopeRoots {
        &self.roots
    }

    pub fn transport(&self) -> &Arc<dyn MetadataTransport> {
        &self.transport
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl std::fmt::Debug for MetadataContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataContext")
            .field("config", &self.config)
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

/// Builder for [`MetadataContext`].
///
/// # Example
///
/// ```rust,ignore
/// use forge_metadata::{CacheScope, MetadataContext, MetadataFetcher};
///
/// let context = MetadataContext::builder()
///     .with_scope(CacheScope::Workspace)
///     .build()?;
/// let fetcher = MetadataFetcher::new(context);
/// ```
#[derive(Default)]
pub struct MetadataContextBuilder {
    config: MetadataConfig,
    roots: Option<ScopeRoots>,
    transport: Option<Arc<dyn MetadataTransport>>,
    clock: Option<Arc<dyn Clock>>,
}

impl MetadataContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use explicit scope roots instead of the home and current directories.
    pub fn with_roots(mut self, roots: ScopeRoots) -> Self {
        self.roots = Some(roots);
        self
    }

    /// Derive scope roots from a home directory and a workspace directory.
    pub fn with_directories(self, home: &Path, workspace: &Path) -> Self {
        self.with_roots(ScopeRoots::for_directories(home, workspace))
    }

    /// Scope that `fetch` reads from and writes through to.
    ///
    /// Default: [`CacheScope::User`]
    pub fn with_scope(mut self, scope: CacheScope) -> Self {
        self.config.scope = scope;
        self
    }

    /// Replace the raw content host, e.g. for a mirror.
    pub fn with_raw_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.raw_base_url = url.into();
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.config.organization = organization.into();
        self
    }

    /// Overall timeout for one remote fetch.
    ///
    /// Default: 10 seconds
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Maximum age at which a cache entry is served without a fetch.
    ///
    /// Default: one hour
    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.config.freshness_window = window;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn MetadataTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate configuration and fill in production defaults.
    pub fn build(self) -> Result<MetadataContext> {
        self.config.validate()?;

        let roots = match self.roots {
            Some(roots) => roots,
            None => ScopeRoots::from_environment()?,
        };

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpClient::with_timeout(self.config.request_timeout)?),
        };

        Ok(MetadataContext {
            config: self.config,
            roots,
            transport,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}
