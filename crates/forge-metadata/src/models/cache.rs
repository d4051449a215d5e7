//! Cache entry types shared by the store and the fetcher.

use crate::models::ObjectKind;
use crate::{MetadataError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Storage tier for a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheScope {
    /// Machine-wide, under the home directory. Shared across projects.
    #[default]
    User,
    /// Project-local, under the current working directory.
    Workspace,
}

impl CacheScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheScope::User => "user",
            CacheScope::Workspace => "workspace",
        }
    }
}

impl FromStr for CacheScope {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" | "global" => Ok(CacheScope::User),
            "workspace" | "local" => Ok(CacheScope::Workspace),
            _ => Err(MetadataError::Config {
                message: format!("Unknown cache scope: {}", s),
            }),
        }
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relative, path-like identifier of one cached payload.
///
/// Built as `{extension}/{kind}s`; stored on disk as `{extension}/{kind}s.json`
/// under the scope's cache root. Segments are restricted to
/// `[a-z0-9_-]` so a key can never escape that root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for one extension's document of the given kind.
    pub fn for_object(extension_key: &str, kind: ObjectKind) -> Result<Self> {
        Self::parse(&format!("{}/{}", extension_key, kind.plural()))
    }

    /// Validate a raw key such as `forgescript/functions`.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        let valid = !normalized.is_empty()
            && normalized.split('/').all(|segment| {
                !segment.is_empty()
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            });

        if !valid {
            return Err(MetadataError::Config {
                message: format!("Invalid cache key: {}", raw),
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Object kind named by the last segment (`functions`, `events`, `enums`).
    pub fn object_kind(&self) -> Option<ObjectKind> {
        let last = self.0.rsplit('/').next()?;
        ObjectKind::ALL.into_iter().find(|kind| kind.plural() == last)
    }

    /// Location of the entry relative to a cache root.
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.0.split('/').collect();
        path.set_extension("json");
        path
    }

    /// Recover a key from a file found under `root`.
    pub fn from_relative_path(root: &Path, file: &Path) -> Option<Self> {
        let relative = file.strip_prefix(root).ok()?;
        if relative.extension()? != "json" {
            return None;
        }
        let stem = relative.with_extension("");
        let raw = stem
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?
            .join("/");
        Self::parse(&raw).ok()
    }
}

impl TryFrom<String> for CacheKey {
    type Error = MetadataError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A payload read back from a scope, with the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T = serde_json::Value> {
    pub scope: CacheScope,
    pub key: CacheKey,
    pub updated_at: DateTime<Utc>,
    pub payload: T,
}

impl<T> CacheEntry<T> {
    /// Age relative to `now`. Entries stamped in the future count as zero age.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.updated_at)
            .max(chrono::Duration::zero())
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheEntry<U> {
        CacheEntry {
            scope: self.scope,
            key: self.key,
            updated_at: self.updated_at,
            payload: f(self.payload),
        }
    }
}

/// Outcome of looking an entry up.
///
/// `Unreadable` covers both IO failures and content that does not parse as
/// a cache file; callers that only care about presence should use
/// [`CacheLookup::found`].
#[derive(Debug)]
pub enum CacheLookup<T = serde_json::Value> {
    Found(CacheEntry<T>),
    NotFound,
    Unreadable { path: PathBuf, reason: String },
}

impl<T> CacheLookup<T> {
    pub fn found(self) -> Option<CacheEntry<T>> {
        match self {
            CacheLookup::Found(entry) => Some(entry),
            CacheLookup::NotFound | CacheLookup::Unreadable { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, CacheLookup::Found(_))
    }

    /// Convert the payload of a found entry.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheLookup<U> {
        match self {
            CacheLookup::Found(entry) => CacheLookup::Found(entry.map(f)),
            CacheLookup::NotFound => CacheLookup::NotFound,
            CacheLookup::Unreadable { path, reason } => CacheLookup::Unreadable { path, reason },
        }
    }
}

/// Summary of one key in one scope, for display by the command layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub scope: CacheScope,
    pub key: CacheKey,
    pub has_cache: bool,
    pub is_fresh: bool,
    #[serde(default)]
    pub age_seconds: Option<u64>,
    #[serde(default)]
    pub cached_at: Option<DateTime<Utc>>,
    /// Number of records (or enums) in the payload, when it is an array or object.
    #[serde(default)]
    pub entry_count: Option<usize>,
}
