//! Result caches keyed by deck contents and configuration.
//!
//! A cached entry is the full [`DeckResult`] of one deck. Any change to the
//! deck bytes or to the resolved configuration changes the key, so entries
//! never need explicit invalidation.

use deck_core::{Config, DeckResult, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Identity of one deck processed under one configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// SHA-256 of the deck bytes.
    pub file_hash: String,
    /// Fingerprint of the resolved configuration.
    pub config_hash: String,
}

impl CacheKey {
    pub fn new(file_hash: impl Into<String>, config: &Config) -> Self {
        Self {
            file_hash: file_hash.into(),
            config_hash: config.fingerprint().to_string(),
        }
    }
}

/// Storage for processed deck results.
///
/// Implementations must be safe to share across batch workers. A failed
/// write is not an error for the run; it only costs a later cache miss.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<DeckResult>;
    fn put(&self, key: &CacheKey, result: &DeckResult);
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, DeckResult>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.write() {
            guard.clear();
        }
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<DeckResult> {
        let guard = self.entries.read().ok()?;
        guard.get(key).cloned()
    }

    fn put(&self, key: &CacheKey, result: &DeckResult) {
        if let Ok(mut guard) = self.entries.write() {
            guard.insert(key.clone(), result.clone());
        }
    }
}

/// One JSON file per entry under a directory.
#[derive(Debug, Clone)]
pub struct JsonDirCache {
    dir: PathBuf,
}

impl JsonDirCache {
    /// Open (and create if needed) a cache directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::Cache(format!("cannot create cache directory {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}-{}.json", key.file_hash, key.config_hash))
    }

    fn write_entry(&self, key: &CacheKey, result: &DeckResult) -> Result<()> {
        let json = serde_json::to_vec(result)
            .map_err(|e| Error::Cache(format!("cannot serialize entry: {}", e)))?;
        let path = self.entry_path(key);
        // Workers may race on the same key. Each writes its own temp file
        // and the rename keeps readers off partial files.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&json)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl ResultCache for JsonDirCache {
    fn get(&self, key: &CacheKey) -> Option<DeckResult> {
        let path = self.entry_path(key);
        let bytes = fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(result) => Some(result),
            Err(e) => {
                log::warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    fn put(&self, key: &CacheKey, result: &DeckResult) {
        if let Err(e) = self.write_entry(key, result) {
            log::warn!("Failed to write cache entry for {}: {}", key.file_hash, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::{Diagnostic, ProcessingMetrics};

    fn key(file: &str) -> CacheKey {
        CacheKey {
            file_hash: file.to_string(),
            config_hash: "cfg".to_string(),
        }
    }

    fn result() -> DeckResult {
        DeckResult {
            records: Vec::new(),
            metrics: ProcessingMetrics {
                total_files: 1,
                processed_files: 1,
                total_slides: 3,
                failed_slides: 1,
                processed_slides: 2,
                ..Default::default()
            },
            diagnostics: vec![Diagnostic::parse_error("a.pptx", 2, "bad xml")],
        }
    }

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::new();
        assert!(cache.get(&key("a")).is_none());
        cache.put(&key("a"), &result());
        assert_eq!(cache.get(&key("a")), Some(result()));
        assert!(cache.get(&key("b")).is_none());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_json_dir_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonDirCache::open(dir.path().join("cache")).unwrap();
        cache.put(&key("a"), &result());

        let reopened = JsonDirCache::open(cache.dir()).unwrap();
        assert_eq!(reopened.get(&key("a")), Some(result()));

        let other_config = CacheKey {
            config_hash: "other".to_string(),
            ..key("a")
        };
        assert!(reopened.get(&other_config).is_none());
    }

    #[test]
    fn test_json_dir_cache_ignores_corrupt_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonDirCache::open(dir.path()).unwrap();
        fs::write(cache.entry_path(&key("a")), b"{not json").unwrap();
        assert!(cache.get(&key("a")).is_none());
    }

    #[test]
    fn test_json_dir_cache_concurrent_writers() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonDirCache::open(dir.path()).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..10 {
                        cache.put(&key("a"), &result());
                    }
                });
            }
        });

        assert_eq!(cache.get(&key("a")), Some(result()));
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "{:?}", leftovers);
    }
}
