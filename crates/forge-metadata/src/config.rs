//! Centralized configuration for forge-metadata.
//!
//! Compile-time constants live in the unit structs below. [`MetadataConfig`]
//! carries the runtime values derived from them and is owned by the
//! [`MetadataContext`](crate::MetadataContext).

use crate::models::CacheScope;
use crate::{MetadataError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const RAW_CONTENT_BASE: &'static str = "https://raw.githubusercontent.com";
    pub const GITHUB_ORG: &'static str = "tryforge";
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const USER_AGENT: &'static str = concat!("forge-metadata/", env!("CARGO_PKG_VERSION"));
}

/// Cache freshness configuration.
pub struct CacheConfig;

impl CacheConfig {
    /// One hour. Callers needing a fresher view pass `force_refresh`.
    pub const FRESHNESS_WINDOW: Duration = Duration::from_millis(3_600_000);
    /// Written by `clear` when the file is kept.
    pub const PLACEHOLDER_CONTENTS: &'static str = "{}";
}

/// Directory and file naming.
pub struct PathsConfig;

impl PathsConfig {
    pub const CONFIG_DIR_NAME: &'static str = ".forgecli";
    pub const METADATA_DIR_NAME: &'static str = "metadata";
    pub const HOME_ENV_VAR: &'static str = "FORGEMETA_HOME";
}

/// Runtime configuration for metadata retrieval.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    /// Base of the raw content host, without trailing slash.
    pub raw_base_url: String,
    /// GitHub organisation that owns every extension repository.
    pub organization: String,
    /// Overall timeout applied to a single remote fetch.
    pub request_timeout: Duration,
    /// Maximum age of a cache entry that is still served without a fetch.
    pub freshness_window: Duration,
    /// Scope that `fetch` reads from and writes through to.
    pub scope: CacheScope,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            raw_base_url: NetworkConfig::RAW_CONTENT_BASE.to_string(),
            organization: NetworkConfig::GITHUB_ORG.to_string(),
            request_timeout: NetworkConfig::REQUEST_TIMEOUT,
            freshness_window: CacheConfig::FRESHNESS_WINDOW,
            scope: CacheScope::User,
        }
    }
}

impl MetadataConfig {
    /// Check that the base URL is usable before any request is built from it.
    pub fn validate(&self) -> Result<()> {
        let parsed = Url::parse(&self.raw_base_url).map_err(|e| MetadataError::Config {
            message: format!("Invalid raw base URL {}: {}", self.raw_base_url, e),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MetadataError::Config {
                message: format!("Raw base URL must be http(s): {}", self.raw_base_url),
            });
        }

        if self.organization.trim().is_empty() {
            return Err(MetadataError::Config {
                message: "GitHub organisation must not be empty".to_string(),
            });
        }

        if self.request_timeout.is_zero() {
            return Err(MetadataError::Config {
                message: "Request timeout must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Base directories of the two cache scopes.
///
/// Each root is a configuration directory (`~/.forgecli` or
/// `<workspace>/.forgecli`); cache entries live under its `metadata/`
/// subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRoots {
    pub user: PathBuf,
    pub workspace: PathBuf,
}

impl ScopeRoots {
    pub fn new(user: impl Into<PathBuf>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            user: user.into(),
            workspace: workspace.into(),
        }
    }

    /// Resolve roots from the process environment.
    ///
    /// `FORGEMETA_HOME` replaces the home directory for the user scope; the
    /// workspace scope is always relative to the current directory.
    pub fn from_environment() -> Result<Self> {
        let home = match std::env::var_os(PathsConfig::HOME_ENV_VAR) {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => dirs::home_dir().ok_or_else(|| MetadataError::Config {
                message: "Could not determine home directory".to_string(),
            })?,
        };
        let workspace = std::env::current_dir().map_err(|e| MetadataError::Io {
            message: "Could not determine current directory".to_string(),
            path: None,
            source: Some(e),
        })?;

        Ok(Self::for_directories(&home, &workspace))
    }

    /// Roots for an explicit home directory and workspace directory.
    pub fn for_directories(home: &Path, workspace: &Path) -> Self {
        Self::new(
            home.join(PathsConfig::CONFIG_DIR_NAME),
            workspace.join(PathsConfig::CONFIG_DIR_NAME),
        )
    }

    pub fn root(&self, scope: CacheScope) -> &Path {
        match scope {
            CacheScope::User => &self.user,
            CacheScope::Workspace => &self.workspace,
        }
    }

    /// Directory holding cached metadata for `scope`.
    pub fn cache_root(&self, scope: CacheScope) -> PathBuf {
        self.root(scope).join(PathsConfig::METADATA_DIR_NAME)
    }
}
