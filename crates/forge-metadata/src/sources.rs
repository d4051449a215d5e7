//! Extension name to upstream repository resolution.
//!
//! The set of extensions is closed: anything not listed in [`Extension`] is
//! rejected with [`MetadataError::UnsupportedExtension`] before any cache or
//! network access happens.

use crate::{MetadataError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extensions whose repositories publish metadata documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extension {
    ForgeScript,
    ForgeDB,
    ForgeCanvas,
    ForgeMusic,
    ForgeTopGG,
}

impl Extension {
    pub const ALL: [Extension; 5] = [
        Extension::ForgeScript,
        Extension::ForgeDB,
        Extension::ForgeCanvas,
        Extension::ForgeMusic,
        Extension::ForgeTopGG,
    ];

    /// Lowercase key used on the command line and in cache keys.
    pub fn key(&self) -> &'static str {
        match self {
            Extension::ForgeScript => "forgescript",
            Extension::ForgeDB => "forgedb",
            Extension::ForgeCanvas => "forgecanvas",
            Extension::ForgeMusic => "forgemusic",
            Extension::ForgeTopGG => "forgetopgg",
        }
    }

    /// Repository name under the GitHub organisation.
    pub fn repository_id(&self) -> &'static str {
        match self {
            Extension::ForgeScript => "ForgeScript",
            Extension::ForgeDB => "ForgeDB",
            Extension::ForgeCanvas => "ForgeCanvas",
            Extension::ForgeMusic => "ForgeMusic",
            Extension::ForgeTopGG => "ForgeTopGG",
        }
    }

    /// Exact lookup after lowercasing; no fuzzy matching.
    pub fn from_key(input: &str) -> Option<Self> {
        let normalized = input.trim().to_lowercase();
        Self::ALL.into_iter().find(|ext| ext.key() == normalized)
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Branch a metadata document is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Main,
    Dev,
}

impl Branch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Main => "main",
            Branch::Dev => "dev",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where one extension's metadata lives upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    pub extension_key: String,
    pub repository_id: String,
    pub branch: Branch,
}

/// Resolve a user-supplied extension name.
///
/// The input is lowercased before lookup. On failure the offending input is
/// echoed back unchanged in the error.
pub fn resolve(extension_key: &str, use_dev_branch: bool) -> Result<SourceDescriptor> {
    let extension =
        Extension::from_key(extension_key).ok_or_else(|| MetadataError::UnsupportedExtension {
            input: extension_key.to_string(),
        })?;

    Ok(SourceDescriptor {
        extension_key: extension.key().to_string(),
        repository_id: extension.repository_id().to_string(),
        branch: if use_dev_branch { Branch::Dev } else { Branch::Main },
    })
}
