//! Scoped JSON cache on disk.
//!
//! Layout: `{scopeRoot}/metadata/{extension}/{kind}s.json`, each file holding
//! `{"cachedAt": <RFC 3339>, "data": <payload>}`. The store knows nothing
//! about freshness beyond reporting ages; the fetcher decides what is stale.

use super::atomic::{atomic_write_bytes, atomic_write_json};
use crate::clock::Clock;
use crate::config::{CacheConfig, ScopeRoots};
use crate::models::{
    CacheEntry, CacheKey, CacheLookup, CacheScope, CacheStatus, EnumTable, EventRecord, FunctionRecord,
    ObjectCollection, ObjectKind,
};
use crate::{MetadataError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// On-disk envelope around a cached payload.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile<T> {
    #[serde(alias = "updatedAt")]
    cached_at: DateTime<Utc>,
    data: T,
}

/// Whether an entry written at `updated_at` is still within `window` at `now`.
///
/// The boundary is inclusive: an entry exactly `window` old is fresh.
pub fn is_fresh(updated_at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    let age = now.signed_duration_since(updated_at).max(chrono::Duration::zero());
    age.to_std().map(|age| age <= window).unwrap_or(false)
}

/// File-backed cache with a user scope and a workspace scope.
///
/// The two scopes never see each other's entries; [`MetadataCache::migrate`]
/// is the only operation that moves data between them.
pub struct MetadataCache {
    roots: ScopeRoots,
    clock: Arc<dyn Clock>,
}

impl MetadataCache {
    pub fn new(roots: ScopeRoots, clock: Arc<dyn Clock>) -> Self {
        Self { roots, clock }
    }

    pub fn roots(&self) -> &ScopeRoots {
        &self.roots
    }

    /// Directory holding every entry of `scope`.
    pub fn cache_root(&self, scope: CacheScope) -> PathBuf {
        self.roots.cache_root(scope)
    }

    /// File backing `key` in `scope`.
    pub fn entry_path(&self, scope: CacheScope, key: &CacheKey) -> PathBuf {
        self.cache_root(scope).join(key.relative_path())
    }

    /// True iff a readable entry exists for `key`.
    pub fn exists(&self, scope: CacheScope, key: &CacheKey) -> bool {
        self.lookup::<serde_json::Value>(scope, key).is_found()
    }

    /// Look an entry up, distinguishing absence from unreadable content.
    ///
    /// The `{}` placeholder left by [`MetadataCache::clear`] counts as absent.
    pub fn lookup<T: DeserializeOwned>(&self, scope: CacheScope, key: &CacheKey) -> CacheLookup<T> {
        let path = self.entry_path(scope, key);

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CacheLookup::NotFound,
            Err(e) => {
                return CacheLookup::Unreadable {
                    path,
                    reason: e.to_string(),
                }
            }
        };

        if contents.trim() == CacheConfig::PLACEHOLDER_CONTENTS {
            return CacheLookup::NotFound;
        }

        match serde_json::from_str::<CacheFile<T>>(&contents) {
            Ok(file) => CacheLookup::Found(CacheEntry {
                scope,
                key: key.clone(),
                updated_at: file.cached_at,
                payload: file.data,
            }),
            Err(e) => CacheLookup::Unreadable {
                path,
                reason: e.to_string(),
            },
        }
    }

    /// Look an entry up as the collection shape `kind` requires.
    ///
    /// The payload is decoded straight into the typed collection, so enum
    /// tables keep their document order. A payload of the wrong shape is
    /// `Unreadable`.
    pub fn lookup_collection(&self, scope: CacheScope, key: &CacheKey, kind: ObjectKind) -> CacheLookup<ObjectCollection> {
        match kind {
            ObjectKind::Function => self
                .lookup::<Vec<FunctionRecord>>(scope, key)
                .map(ObjectCollection::Functions),
            ObjectKind::Event => self
                .lookup::<Vec<EventRecord>>(scope, key)
                .map(ObjectCollection::Events),
            ObjectKind::Enum => self.lookup::<EnumTable>(scope, key).map(ObjectCollection::Enums),
        }
    }

    /// Read an entry; unreadable content is reported exactly like a miss.
    pub fn read<T: DeserializeOwned>(&self, scope: CacheScope, key: &CacheKey) -> Option<CacheEntry<T>> {
        self.lookup(scope, key).found()
    }

    /// Replace the entry for `key` with `payload`, stamped with the current time.
    ///
    /// Returns the stamp that was written.
    pub fn write<T: Serialize>(&self, scope: CacheScope, key: &CacheKey, payload: &T) -> Result<DateTime<Utc>> {
        let path = self.entry_path(scope, key);
        let cached_at = self.clock.now();

        atomic_write_json(
            &path,
            &CacheFile {
                cached_at,
                data: payload,
            },
        )?;

        debug!(scope = %scope, key = %key, path = %path.display(), "Cache entry written");
        Ok(cached_at)
    }

    /// Remove an entry, or blank it with a placeholder when `delete_file` is false.
    ///
    /// Clearing a key that has no file is a no-op.
    pub fn clear(&self, scope: CacheScope, key: &CacheKey, delete_file: bool) -> Result<()> {
        let path = self.entry_path(scope, key);

        if delete_file {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(MetadataError::io_with_path(e, &path)),
            }
        } else {
            if !path.exists() {
                return Ok(());
            }
            atomic_write_bytes(&path, CacheConfig::PLACEHOLDER_CONTENTS.as_bytes())?;
        }

        info!(scope = %scope, key = %key, deleted = delete_file, "Cleared cache entry");
        Ok(())
    }

    /// Delete every entry of `scope` by removing its cache root.
    pub fn clear_all(&self, scope: CacheScope) -> Result<()> {
        let root = self.cache_root(scope);
        match std::fs::remove_dir_all(&root) {
            Ok(()) => {
                info!(scope = %scope, root = %root.display(), "Cleared cache scope");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MetadataError::io_with_path(e, root)),
        }
    }

    /// Copy the payload of `key` from one scope to another.
    ///
    /// The destination is stamped with the current time. Returns false when the
    /// source entry is missing or unreadable, or the destination write fails.
    pub fn migrate(&self, from: CacheScope, to: CacheScope, key: &CacheKey) -> bool {
        // Typed copy keeps enum document order.
        match key.object_kind() {
            Some(kind) => self.copy_entry(from, to, key, self.lookup_collection(from, key, kind)),
            None => self.copy_entry(from, to, key, self.lookup::<serde_json::Value>(from, key)),
        }
    }

    /// Presence, age and freshness of one entry.
    pub fn status(&self, scope: CacheScope, key: &CacheKey, window: Duration) -> CacheStatus {
        let now = self.clock.now();
        match self.read::<serde_json::Value>(scope, key) {
            Some(entry) => {
                let entry_count = match &entry.payload {
                    serde_json::Value::Array(items) => Some(items.len()),
                    serde_json::Value::Object(map) => Some(map.len()),
                    _ => None,
                };
                CacheStatus {
                    scope,
                    key: key.clone(),
                    has_cache: true,
                    is_fresh: is_fresh(entry.updated_at, now, window),
                    age_seconds: entry.age(now).num_seconds().try_into().ok(),
                    cached_at: Some(entry.updated_at),
                    entry_count,
                }
            }
            None => CacheStatus {
                scope,
                key: key.clone(),
                has_cache: false,
                is_fresh: false,
                age_seconds: None,
                cached_at: None,
                entry_count: None,
            },
        }
    }

    fn copy_entry<T: Serialize>(
        &self,
        from: CacheScope,
        to: CacheScope,
        key: &CacheKey,
        lookup: CacheLookup<T>,
    ) -> bool {
        let entry = match lookup {
            CacheLookup::Found(entry) => entry,
            CacheLookup::NotFound => {
                debug!(from = %from, key = %key, "Nothing to migrate");
                return false;
            }
            CacheLookup::Unreadable { path, reason } => {
                warn!(path = %path.display(), %reason, "Cannot migrate unreadable cache entry");
                return false;
            }
        };

        match self.write(to, key, &entry.payload) {
            Ok(_) => {
                info!(from = %from, to = %to, key = %key, "Migrated cache entry");
                true
            }
            Err(e) => {
                warn!(from = %from, to = %to, key = %key, "Cache migration failed: {}", e);
                false
            }
        }
    }

    /// Every key with a file under `scope`, sorted.
    ///
    /// Placeholders and unreadable files are listed too; use
    /// [`MetadataCache::status`] to tell them apart.
    pub fn list(&self, scope: CacheScope) -> Result<Vec<CacheKey>> {
        let root = self.cache_root(scope);
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&root).min_depth(1) {
            let entry = entry.map_err(|e| MetadataError::Io {
                message: format!("Failed to walk {}: {}", root.display(), e),
                path: e.path().map(|p| p.to_path_buf()),
                source: None,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(key) = CacheKey::from_relative_path(&root, entry.path()) {
                keys.push(key);
            }
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    fn create_test_cache() -> (MetadataCache, Arc<ManualClock>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let roots = ScopeRoots::for_directories(
            &temp_dir.path().join("home"),
            &temp_dir.path().join("project"),
        );
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = MetadataCache::new(roots, clock.clone());
        (cache, clock, temp_dir)
    }

    fn key(raw: &str) -> CacheKey {
        CacheKey::parse(raw).unwrap()
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let (cache, clock, _temp) = create_test_cache();
        let k = key("forgescript/functions");
        let payload = json!([{"name": "$ping", "description": "Latency"}]);

        let stamp = cache.write(CacheScope::User, &k, &payload).unwrap();
        assert_eq!(stamp, clock.now());

        let entry = cache.read::<serde_json::Value>(CacheScope::User, &k).unwrap();
        assert_eq!(entry.payload, payload);
        assert_eq!(entry.updated_at, stamp);
        assert_eq!(entry.key, k);
        assert!(cache.exists(CacheScope::User, &k));
    }

    #[test]
    fn test_file_layout_and_envelope() {
        let (cache, _clock, temp) = create_test_cache();
        let k = key("forgedb/enums");
        cache.write(CacheScope::Workspace, &k, &json!({"Color": ["Red"]})).unwrap();

        let path = temp
            .path()
            .join("project")
            .join(".forgecli")
            .join("metadata")
            .join("forgedb")
            .join("enums.json");
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert!(raw["cachedAt"].is_string());
        assert_eq!(raw["data"], json!({"Color": ["Red"]}));
    }

    #[test]
    fn test_rewrite_restamps_entry() {
        let (cache, clock, _temp) = create_test_cache();
        let k = key("forgescript/events");

        let first = cache.write(CacheScope::User, &k, &json!([])).unwrap();
        clock.advance(chrono::Duration::minutes(30));
        let second = cache.write(CacheScope::User, &k, &json!([{"name": "ready"}])).unwrap();

        assert!(second > first);
        let entry = cache.read::<serde_json::Value>(CacheScope::User, &k).unwrap();
        assert_eq!(entry.updated_at, second);
        assert_eq!(entry.payload, json!([{"name": "ready"}]));
    }

    #[test]
    fn test_lookup_distinguishes_missing_from_corrupt() {
        let (cache, _clock, _temp) = create_test_cache();
        let k = key("forgescript/functions");

        assert!(matches!(
            cache.lookup::<serde_json::Value>(CacheScope::User, &k),
            CacheLookup::NotFound
        ));

        let path = cache.entry_path(CacheScope::User, &k);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{\"cachedAt\": \"2024-01-01T00:00:00Z\", \"data\": [").unwrap();

        assert!(matches!(
            cache.lookup::<serde_json::Value>(CacheScope::User, &k),
            CacheLookup::Unreadable { .. }
        ));
        assert!(cache.read::<serde_json::Value>(CacheScope::User, &k).is_none());
        assert!(!cache.exists(CacheScope::User, &k));
    }

    #[test]
    fn test_legacy_updated_at_field_is_accepted() {
        let (cache, _clock, _temp) = create_test_cache();
        let k = key("forgemusic/events");
        let path = cache.entry_path(CacheScope::User, &k);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"updatedAt": "2024-05-01T12:00:00Z", "data": []}"#).unwrap();

        let entry = cache.read::<serde_json::Value>(CacheScope::User, &k).unwrap();
        assert_eq!(entry.updated_at.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_scopes_are_isolated() {
        let (cache, _clock, _temp) = create_test_cache();
        let k = key("forgescript/functions");

        cache.write(CacheScope::Workspace, &k, &json!(["workspace"])).unwrap();
        assert!(cache.read::<serde_json::Value>(CacheScope::User, &k).is_none());

        cache.write(CacheScope::User, &k, &json!(["user"])).unwrap();
        let workspace = cache.read::<serde_json::Value>(CacheScope::Workspace, &k).unwrap();
        assert_eq!(workspace.payload, json!(["workspace"]));
    }

    #[test]
    fn test_clear_with_placeholder_reads_as_missing() {
        let (cache, _clock, _temp) = create_test_cache();
        let k = key("forgecanvas/functions");
        cache.write(CacheScope::User, &k, &json!([])).unwrap();

        cache.clear(CacheScope::User, &k, false).unwrap();
        let path = cache.entry_path(CacheScope::User, &k);
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert!(matches!(
            cache.lookup::<serde_json::Value>(CacheScope::User, &k),
            CacheLookup::NotFound
        ));

        cache.clear(CacheScope::User, &k, true).unwrap();
        assert!(!path.exists());

        // Clearing again is a no-op.
        cache.clear(CacheScope::User, &k, true).unwrap();
    }

    #[test]
    fn test_clear_all_only_touches_one_scope() {
        let (cache, _clock, _temp) = create_test_cache();
        let k = key("forgescript/functions");
        cache.write(CacheScope::User, &k, &json!([])).unwrap();
        cache.write(CacheScope::Workspace, &k, &json!([])).unwrap();

        cache.clear_all(CacheScope::Workspace).unwrap();
        assert!(!cache.cache_root(CacheScope::Workspace).exists());
        assert!(cache.roots().root(CacheScope::Workspace).exists());
        assert!(cache.exists(CacheScope::User, &k));

        // Missing root is fine.
        cache.clear_all(CacheScope::Workspace).unwrap();
    }

    #[test]
    fn test_migrate_copies_payload_and_restamps() {
        let (cache, clock, _temp) = create_test_cache();
        let k = key("forgedb/functions");
        let payload = json!([{"name": "$dbGet"}]);

        let original = cache.write(CacheScope::User, &k, &payload).unwrap();
        clock.advance(chrono::Duration::hours(3));

        assert!(cache.migrate(CacheScope::User, CacheScope::Workspace, &k));
        let migrated = cache.read::<serde_json::Value>(CacheScope::Workspace, &k).unwrap();
        assert_eq!(migrated.payload, payload);
        assert_eq!(migrated.updated_at, original + chrono::Duration::hours(3));
    }

    #[test]
    fn test_migrate_missing_or_corrupt_source_returns_false() {
        let (cache, _clock, _temp) = create_test_cache();
        let k = key("forgedb/events");
        assert!(!cache.migrate(CacheScope::Workspace, CacheScope::User, &k));

        let path = cache.entry_path(CacheScope::Workspace, &k);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        assert!(!cache.migrate(CacheScope::Workspace, CacheScope::User, &k));
        assert!(!cache.exists(CacheScope::User, &k));
    }

    #[test]
    fn test_status_reports_age_and_freshness() {
        let (cache, clock, _temp) = create_test_cache();
        let k = key("forgescript/enums");
        let window = Duration::from_secs(3600);

        let missing = cache.status(CacheScope::User, &k, window);
        assert!(!missing.has_cache);
        assert!(!missing.is_fresh);

        cache
            .write(CacheScope::User, &k, &json!({"A": ["x"], "B": ["y"]}))
            .unwrap();
        clock.advance(chrono::Duration::minutes(10));

        let status = cache.status(CacheScope::User, &k, window);
        assert!(status.has_cache);
        assert!(status.is_fresh);
        assert_eq!(status.age_seconds, Some(600));
        assert_eq!(status.entry_count, Some(2));

        clock.advance(chrono::Duration::minutes(51));
        assert!(!cache.status(CacheScope::User, &k, window).is_fresh);
    }

    #[test]
    fn test_list_returns_sorted_keys() {
        let (cache, _clock, _temp) = create_test_cache();
        assert!(cache.list(CacheScope::User).unwrap().is_empty());

        for raw in ["forgescript/functions", "forgedb/events", "forgescript/enums"] {
            cache.write(CacheScope::User, &key(raw), &json!([])).unwrap();
        }
        std::fs::write(cache.cache_root(CacheScope::User).join("README.txt"), "x").unwrap();

        let keys: Vec<String> = cache
            .list(CacheScope::User)
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            keys,
            vec!["forgedb/events", "forgescript/enums", "forgescript/functions"]
        );
    }

    #[test]
    fn test_freshness_boundary_is_inclusive() {
        let now = Utc::now();
        let window = Duration::from_millis(3_600_000);
        assert!(is_fresh(now - chrono::Duration::hours(1), now, window));
        assert!(!is_fresh(
            now - chrono::Duration::hours(1) - chrono::Duration::milliseconds(1),
            now,
            window
        ));
        assert!(is_fresh(now + chrono::Duration::seconds(5), now, window));
    }

    #[test]
    fn test_clear_tolerates_file_removed_elsewhere() {
        let (cache, _clock, _temp) = create_test_cache();
        let k = key("forgetopgg/events");
        cache.write(CacheScope::User, &k, &json!([])).unwrap();

        // Another process got there first.
        std::fs::remove_file(cache.entry_path(CacheScope::User, &k)).unwrap();

        cache.clear(CacheScope::User, &k, true).unwrap();
        cache.clear(CacheScope::User, &k, false).unwrap();
        assert!(!cache.entry_path(CacheScope::User, &k).exists());
    }

    #[test]
    fn test_lookup_collection_keeps_enum_order() {
        let (cache, _clock, _temp) = create_test_cache();
        let k = key("forgescript/enums");
        let path = cache.entry_path(CacheScope::User, &k);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"cachedAt": "2024-06-01T12:00:00Z", "data": {"Zeta": ["Shared"], "Alpha": ["Shared"]}}"#,
        )
        .unwrap();

        let entry = cache
            .lookup_collection(CacheScope::User, &k, ObjectKind::Enum)
            .found()
            .unwrap();
        let ObjectCollection::Enums(table) = entry.payload else {
            panic!("expected enums");
        };
        let names: Vec<_> = table.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);

        // Wrong shape for the kind is unreadable, not a panic or a hit.
        assert!(matches!(
            cache.lookup_collection(CacheScope::User, &k, ObjectKind::Function),
            CacheLookup::Unreadable { .. }
        ));
    }

    #[test]
    fn test_migrate_keeps_enum_document_order() {
        let (cache, _clock, _temp) = create_test_cache();
        let k = key("forgescript/enums");
        let table: EnumTable = [
            ("Zeta", vec!["Shared".to_string()]),
            ("Alpha", vec!["Shared".to_string()]),
        ]
        .into_iter()
        .collect();
        cache
            .write(CacheScope::Workspace, &k, &ObjectCollection::Enums(table.clone()))
            .unwrap();

        assert!(cache.migrate(CacheScope::Workspace, CacheScope::User, &k));

        let migrated = cache
            .lookup_collection(CacheScope::User, &k, ObjectKind::Enum)
            .found()
            .unwrap();
        assert_eq!(migrated.payload, ObjectCollection::Enums(table));
    }

    #[test]
    fn test_concurrent_writers_never_expose_partial_documents() {
        let (cache, _clock, _temp) = create_test_cache();
        let k = key("forgescript/enums");
        let payloads: Vec<serde_json::Value> = (0..4)
            .map(|writer| {
                let table: serde_json::Map<String, serde_json::Value> = (0..200)
                    .map(|i| (format!("Enum{}x{}", writer, i), json!(vec![format!("value-{}-{}", writer, i); 8])))
                    .collect();
                serde_json::Value::Object(table)
            })
            .collect();
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            let reader = scope.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    match cache.lookup::<serde_json::Value>(CacheScope::User, &k) {
                        CacheLookup::Found(entry) => assert!(payloads.contains(&entry.payload)),
                        CacheLookup::NotFound => {}
                        CacheLookup::Unreadable { reason, .. } => panic!("reader saw a partial document: {}", reason),
                    }
                }
            });

            let writers: Vec<_> = payloads
                .iter()
                .map(|payload| {
                    let (cache, k) = (&cache, &k);
                    scope.spawn(move || {
                        for _ in 0..25 {
                            cache.write(CacheScope::User, k, payload).unwrap();
                        }
                    })
                })
                .collect();

            for writer in writers {
                writer.join().unwrap();
            }
            done.store(true, Ordering::Release);
            reader.join().unwrap();
        });

        // Last writer wins with one complete payload.
        let entry = cache.read::<serde_json::Value>(CacheScope::User, &k).unwrap();
        assert!(payloads.contains(&entry.payload));
        let leftovers = std::fs::read_dir(cache.entry_path(CacheScope::User, &k).parent().unwrap())
            .unwrap()
            .count();
        assert_eq!(leftovers, 1);
    }
}
