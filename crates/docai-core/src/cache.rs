//! Cache boundary shared by the embedder (vectors) and enhancement
//! components (generated text).
//!
//! Values are stored as JSON so one store can hold both payload kinds. An
//! optional model qualifier separates entries produced by different models.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::DocaiError;

/// Key/value store for cached provider output.
///
/// Stores are single-writer; no cross-process locking is performed.
pub trait Cache: Send + Sync {
    /// Look up `key`, qualified by `model` when given.
    fn get(&self, key: &str, model: Option<&str>) -> Option<serde_json::Value>;

    /// Store `value` under `key`, qualified by `model` when given.
    ///
    /// # Errors
    ///
    /// Returns [`DocaiError`] if the entry cannot be persisted.
    fn set(&self, key: &str, value: serde_json::Value, model: Option<&str>)
        -> Result<(), DocaiError>;
}

fn qualified_key(key: &str, model: Option<&str>) -> String {
    format!("{}\u{0}{key}", model.unwrap_or_default())
}

/// In-process cache backed by a map.
///
/// # Examples
///
/// ```
/// use docai_core::{Cache, MemoryCache};
///
/// let cache = MemoryCache::new();
/// cache.set("greeting", serde_json::json!("hello"), None).unwrap();
/// assert_eq!(cache.get("greeting", None), Some(serde_json::json!("hello")));
/// assert_eq!(cache.get("greeting", Some("gpt-4o")), None);
/// ```
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str, model: Option<&str>) -> Option<serde_json::Value> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&qualified_key(key, model)).cloned()
    }

    fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        model: Option<&str>,
    ) -> Result<(), DocaiError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(qualified_key(key, model), value);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    #[serde(default)]
    model: Option<String>,
    value: serde_json::Value,
}

/// Cache persisted as one JSON file per entry under a directory.
///
/// File names are the SHA-256 of the qualified key, so arbitrary keys
/// (including raw text prefixes) are safe. Unreadable entries are misses.
///
/// # Examples
///
/// ```
/// use docai_core::{Cache, FileCache};
///
/// let dir = tempfile::tempdir().unwrap();
/// let cache = FileCache::new(dir.path());
/// cache.set("embedding_0123456789abcdef", serde_json::json!([0.5, -0.5]), None).unwrap();
/// assert!(cache.get("embedding_0123456789abcdef", None).is_some());
/// ```
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Use `dir` for cache entries. The directory is created on first write.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Cache from the `[cache]` section, or `None` when caching is disabled.
    ///
    /// Entries go in a `cache` subdirectory so [`clear`](Self::clear) never
    /// touches a search index stored next to them.
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config.enabled.then(|| Self::new(config.dir.join("cache")))
    }

    /// Directory holding cache entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove every cache entry.
    ///
    /// # Errors
    ///
    /// Returns [`DocaiError::Io`] if an entry cannot be removed.
    pub fn clear(&self) -> Result<(), DocaiError> {
        if !self.dir.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn entry_path(&self, key: &str, model: Option<&str>) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(qualified_key(key, model).as_bytes());
        self.dir.join(format!("{:x}.json", hasher.finalize()))
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str, model: Option<&str>) -> Option<serde_json::Value> {
        let path = self.entry_path(key, model);
        let bytes = fs::read(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("ignoring unreadable cache entry {}: {e}", path.display());
                return None;
            }
        };
        (entry.key == key && entry.model.as_deref() == model).then_some(entry.value)
    }

    fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        model: Option<&str>,
    ) -> Result<(), DocaiError> {
        fs::create_dir_all(&self.dir)?;
        let entry = CacheEntry {
            key: key.to_string(),
            model: model.map(str::to_string),
            value,
        };
        fs::write(self.entry_path(key, model), serde_json::to_vec(&entry)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_cache_separates_models() {
        let cache = MemoryCache::new();
        cache.set("k", json!("a"), Some("m1")).unwrap();
        cache.set("k", json!("b"), Some("m2")).unwrap();
        assert_eq!(cache.get("k", Some("m1")), Some(json!("a")));
        assert_eq!(cache.get("k", Some("m2")), Some(json!("b")));
        assert_eq!(cache.get("k", None), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn memory_cache_overwrites() {
        let cache = MemoryCache::new();
        cache.set("k", json!(1), None).unwrap();
        cache.set("k", json!(2), None).unwrap();
        assert_eq!(cache.get("k", None), Some(json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn file_cache_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        FileCache::new(dir.path())
            .set("grammar_fix_Some text", json!("Some text."), Some("llama3"))
            .unwrap();

        let reopened = FileCache::new(dir.path());
        assert_eq!(
            reopened.get("grammar_fix_Some text", Some("llama3")),
            Some(json!("Some text."))
        );
        assert_eq!(reopened.get("grammar_fix_Some text", None), None);
    }

    #[test]
    fn file_cache_missing_dir_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("nested/cache"));
        assert_eq!(cache.get("absent", None), None);
    }

    #[test]
    fn file_cache_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        cache.set("k", json!([1.0]), None).unwrap();
        fs::write(cache.entry_path("k", None), b"{truncated").unwrap();
        assert_eq!(cache.get("k", None), None);
    }

    #[test]
    fn file_cache_from_config() {
        let config = CacheConfig::default();
        let cache = FileCache::from_config(&config).unwrap();
        assert_eq!(cache.dir(), Path::new(".ai-cache/cache"));

        let disabled = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        assert!(FileCache::from_config(&disabled).is_none());
    }

    #[test]
    fn file_cache_clear_removes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        cache.set("a", json!(1), None).unwrap();
        cache.set("b", json!(2), None).unwrap();
        cache.clear().unwrap();
        assert_eq!(cache.get("a", None), None);
        assert_eq!(cache.get("b", None), None);
    }
}
