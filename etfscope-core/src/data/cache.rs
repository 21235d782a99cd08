//! Key/value cache with timestamped entries.
//!
//! Layout of the file cache: `{cache_dir}/{blake3(key)}.json`, one entry per file.
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Freshness decided by a pure function of (stored_at, now, ttl)
//! - Quarantine for corrupt files ({filename}.quarantined), read as a miss
//! - Read-only status listing for the CLI
//! - Only files named `<blake3 hex>.json*` are ever read, listed or removed

use super::provider::DataError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// A cached value and the moment it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: String,
    pub stored_at: DateTime<Utc>,
}

/// Storage for cached payloads. Implementations don't judge freshness.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheEntry>;

    fn set(&self, key: &str, value: &str, stored_at: DateTime<Utc>) -> Result<(), DataError>;

    fn remove(&self, key: &str) -> Result<(), DataError>;

    fn clear(&self) -> Result<(), DataError>;
}

/// Fresh iff `0 <= now - stored_at < ttl`. Entries stamped in the future are stale.
pub fn is_fresh(stored_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    let age = now - stored_at;
    age >= Duration::zero() && age < ttl
}

/// Read an entry only if it is still fresh.
pub fn get_fresh(
    cache: &dyn Cache,
    key: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Option<CacheEntry> {
    let entry = cache.get(key)?;
    if is_fresh(entry.stored_at, now, ttl) {
        log::debug!("cache.hit key={key}");
        Some(entry)
    } else {
        log::debug!("cache.stale key={key} stored_at={}", entry.stored_at);
        None
    }
}

// ── In-memory cache ─────────────────────────────────────────────────

/// Process-local cache, used in tests and with `--no-cache`-style runs that
/// still want intra-process reuse.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str, stored_at: DateTime<Utc>) -> Result<(), DataError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.to_string(),
                CacheEntry {
                    value: value.to_string(),
                    stored_at,
                },
            );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DataError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), DataError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

// ── File cache ──────────────────────────────────────────────────────

/// On-disk form of an entry. The key is kept so `status()` can report it.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    value: String,
    stored_at: DateTime<Utc>,
}

/// One row of `FileCache::status()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub key: String,
    pub stored_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// JSON-file cache that survives restarts.
pub struct FileCache {
    cache_dir: PathBuf,
}

impl FileCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let name = blake3::hash(key.as_bytes()).to_hex();
        self.cache_dir.join(format!("{name}.json"))
    }

    fn read_entry(path: &Path) -> Result<StoredEntry, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }

    fn quarantine(path: &Path, reason: &str) {
        let target = path.with_extension("json.quarantined");
        log::warn!(
            "cache.quarantine path={} reason={reason}",
            path.display()
        );
        let _ = fs::rename(path, target);
    }

    /// Every readable entry, sorted by key. Read-only: files that are not
    /// cache entries are ignored and unreadable entries are skipped.
    pub fn status(&self) -> Vec<CacheStatus> {
        let Ok(dir) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };

        let mut rows = Vec::new();
        for entry in dir.flatten() {
            let name = entry.file_name();
            if !is_owned_file(&name.to_string_lossy(), &[ENTRY_SUFFIX]) {
                continue;
            }
            let path = entry.path();
            match Self::read_entry(&path) {
                Ok(stored) => rows.push(CacheStatus {
                    key: stored.key,
                    stored_at: stored.stored_at,
                    size_bytes: entry.metadata().map(|m| m.len()).unwrap_or(0),
                }),
                Err(reason) => {
                    log::warn!("cache.status.skipped path={} reason={reason}", path.display());
                }
            }
        }
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        rows
    }
}

const ENTRY_SUFFIX: &str = ".json";
const OWNED_SUFFIXES: [&str; 3] = [ENTRY_SUFFIX, ".json.tmp", ".json.quarantined"];

/// Whether `file_name` is `<blake3 hex><suffix>` for one of `suffixes`.
fn is_owned_file(file_name: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|suffix| {
        file_name.strip_suffix(suffix).is_some_and(|stem| {
            stem.len() == blake3::OUT_LEN * 2 && stem.bytes().all(|b| b.is_ascii_hexdigit())
        })
    })
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }
        match Self::read_entry(&path) {
            Ok(stored) if stored.key == key => Some(CacheEntry {
                value: stored.value,
                stored_at: stored.stored_at,
            }),
            Ok(stored) => {
                log::warn!("cache.key_mismatch expected={key} found={}", stored.key);
                None
            }
            Err(reason) => {
                Self::quarantine(&path, &reason);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str, stored_at: DateTime<Utc>) -> Result<(), DataError> {
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let stored = StoredEntry {
            key: key.to_string(),
            value: value.to_string(),
            stored_at,
        };
        let json = serde_json::to_string(&stored)
            .map_err(|e| DataError::CacheError(format!("entry serialization: {e}")))?;

        let path = self.entry_path(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| DataError::CacheError(format!("write {}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        log::debug!("cache.write key={key}");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DataError> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DataError::CacheError(format!(
                "remove {}: {e}",
                path.display()
            ))),
        }
    }

    /// Remove every file this cache wrote. Other files in the directory stay.
    fn clear(&self) -> Result<(), DataError> {
        let dir = match fs::read_dir(&self.cache_dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(DataError::CacheError(format!("clear cache: {e}"))),
        };
        for entry in dir.flatten() {
            if !is_owned_file(&entry.file_name().to_string_lossy(), &OWNED_SUFFIXES) {
                continue;
            }
            fs::remove_file(entry.path()).map_err(|e| {
                DataError::CacheError(format!("remove {}: {e}", entry.path().display()))
            })?;
        }
        log::debug!("cache.cleared dir={}", self.cache_dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, minute, 0).unwrap()
    }

    #[test]
    fn freshness_window_is_half_open() {
        let ttl = Duration::minutes(30);
        assert!(is_fresh(at(0), at(0), ttl));
        assert!(is_fresh(at(0), at(29), ttl));
        assert!(!is_fresh(at(0), at(30), ttl));
    }

    #[test]
    fn future_entries_are_stale() {
        assert!(!is_fresh(at(10), at(5), Duration::minutes(30)));
    }

    #[test]
    fn memory_cache_round_trip() {
        let cache = MemoryCache::new();
        assert!(cache.get("k").is_none());
        cache.set("k", "v", at(0)).unwrap();
        assert_eq!(cache.get("k").unwrap().value, "v");
        cache.remove("k").unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn get_fresh_skips_stale_entries() {
        let cache = MemoryCache::new();
        cache.set("k", "v", at(0)).unwrap();
        assert!(get_fresh(&cache, "k", at(10), Duration::minutes(30)).is_some());
        assert!(get_fresh(&cache, "k", at(45), Duration::minutes(30)).is_none());
    }

    #[test]
    fn file_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("cache"));
        cache.set("quote:SPY", "{\"p\":1}", at(3)).unwrap();

        let entry = cache.get("quote:SPY").unwrap();
        assert_eq!(entry.value, "{\"p\":1}");
        assert_eq!(entry.stored_at, at(3));

        let status = cache.status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].key, "quote:SPY");
        assert!(status[0].size_bytes > 0);
    }

    #[test]
    fn file_cache_leaves_no_tmp_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        cache.set("a", "1", at(0)).unwrap();
        cache.set("a", "2", at(1)).unwrap();
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));
        assert_eq!(cache.get("a").unwrap().value, "2");
    }

    #[test]
    fn corrupt_file_is_quarantined_and_missed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        cache.set("k", "v", at(0)).unwrap();
        let path = cache.entry_path("k");
        fs::write(&path, "not json").unwrap();

        assert!(cache.get("k").is_none());
        assert!(!path.exists());
        assert!(path.with_extension("json.quarantined").exists());
    }

    #[test]
    fn clear_and_remove_tolerate_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("never-created"));
        cache.remove("nothing").unwrap();
        cache.clear().unwrap();
        assert!(cache.status().is_empty());
    }

    #[test]
    fn foreign_files_survive_status_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let package = dir.path().join("package.json");
        fs::write(&package, r#"{"name":"x"}"#).unwrap();
        let notes = dir.path().join("notes.txt");
        fs::write(&notes, "keep").unwrap();
        cache.set("k", "v", at(0)).unwrap();

        let status = cache.status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].key, "k");
        assert!(package.exists());

        cache.clear().unwrap();
        assert!(cache.get("k").is_none());
        assert!(package.exists());
        assert!(notes.exists());
    }

    #[test]
    fn status_does_not_touch_corrupt_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        cache.set("k", "v", at(0)).unwrap();
        let path = cache.entry_path("k");
        fs::write(&path, "not json").unwrap();

        assert!(cache.status().is_empty());
        assert!(path.exists());
    }

    #[test]
    fn owned_file_names() {
        let hex = blake3::hash(b"k").to_hex().to_string();
        assert!(is_owned_file(&format!("{hex}.json"), &[ENTRY_SUFFIX]));
        assert!(is_owned_file(&format!("{hex}.json.tmp"), &OWNED_SUFFIXES));
        assert!(!is_owned_file(&format!("{hex}.json.tmp"), &[ENTRY_SUFFIX]));
        assert!(!is_owned_file("package.json", &OWNED_SUFFIXES));
        assert!(!is_owned_file("tsconfig.json", &OWNED_SUFFIXES));
    }

    #[test]
    fn clear_drops_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("c"));
        cache.set("a", "1", at(0)).unwrap();
        cache.set("b", "2", at(0)).unwrap();
        cache.clear().unwrap();
        assert!(cache.get("a").is_none());
        assert!(cache.status().is_empty());
    }
}
