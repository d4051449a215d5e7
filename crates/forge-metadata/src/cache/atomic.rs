//! Atomic file operations for cache persistence.
//!
//! Writes go to a uniquely named temp file in the target's directory, are
//! synced, then renamed over the target. A concurrent reader sees either the
//! previous document or the new one, never a partial write. Concurrent
//! writers do not lock each other out; the last rename wins.

use crate::{MetadataError, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Serialize `data` as pretty JSON and atomically replace `path` with it.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(data).map_err(|e| MetadataError::Json {
        message: format!("Failed to serialize {}: {}", path.display(), e),
        source: Some(e),
    })?;

    atomic_write_bytes(path, serialized.as_bytes())
}

/// Atomically replace `path` with `contents`, creating parent directories.
pub fn atomic_write_bytes(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| MetadataError::Io {
        message: format!("{} has no parent directory", path.display()),
        path: Some(path.to_path_buf()),
        source: None,
    })?;

    fs::create_dir_all(parent).map_err(|e| MetadataError::Io {
        message: format!("Failed to create directory {}", parent.display()),
        path: Some(parent.to_path_buf()),
        source: Some(e),
    })?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| MetadataError::Io {
        message: format!("Failed to create temp file in {}", parent.display()),
        path: Some(parent.to_path_buf()),
        source: Some(e),
    })?;

    temp.write_all(contents)
        .and_then(|_| temp.flush())
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| MetadataError::Io {
            message: format!("Failed to write temp file {}", temp.path().display()),
            path: Some(temp.path().to_path_buf()),
            source: Some(e),
        })?;

    temp.persist(path).map_err(|e| MetadataError::Io {
        message: format!("Failed to replace {}", path.display()),
        path: Some(path.to_path_buf()),
        source: Some(e.error),
    })?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}
