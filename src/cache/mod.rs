//! Content-addressed embedding cache with LRU eviction and JSON
//! persistence. Survives process restarts via a single serialized file;
//! a corrupt or missing file is recovered by starting empty rather than
//! failing the caller.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const EMBEDDING_DIMENSIONS: usize = 768;
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct CacheEntry {
    id: String,
    hash: String,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    entries: Vec<CacheEntry>,
}

/// Hashes file content into the key used for cache invalidation. Not the
/// same as the entry `id` — `id` names the thing being embedded (e.g. a
/// file path or symbol); `hash` is the content fingerprint that's
/// compared to detect staleness.
pub fn content_hash(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Least-recently-used cache over `id -> (hash, embedding)`. `put`/`get`/
/// `contains` all count as a use for recency purposes.
pub struct EmbeddingCache {
    max_entries: usize,
    entries: HashMap<String, CacheEntry>,
    recency: Vec<String>,
}

impl EmbeddingCache {
    pub fn new(max_entries: usize) -> Self {
        EmbeddingCache { max_entries, entries: HashMap::new(), recency: Vec::new() }
    }

    fn touch(&mut self, id: &str) {
        self.recency.retain(|existing| existing != id);
        self.recency.push(id.to_string());
    }

    fn evict_if_needed(&mut self) {
        while self.entries.len() > self.max_entries {
            if self.recency.is_empty() {
                break;
            }
            let oldest = self.recency.remove(0);
            self.entries.remove(&oldest);
        }
    }

    pub fn put(&mut self, id: impl Into<String>, hash: impl Into<String>, embedding: Vec<f32>) {
        let id = id.into();
        self.entries.insert(id.clone(), CacheEntry { id: id.clone(), hash: hash.into(), embedding });
        self.touch(&id);
        self.evict_if_needed();
    }

    /// Returns the cached embedding only if `hash` matches the stored
    /// fingerprint. A mismatch evicts the stale entry and returns `None`,
    /// same as a straight miss.
    pub fn get(&mut self, id: &str, hash: &str) -> Option<Vec<f32>> {
        let matches = self.entries.get(id).map(|e| e.hash == hash).unwrap_or(false);
        if !matches {
            if self.entries.remove(id).is_some() {
                self.recency.retain(|existing| existing != id);
            }
            return None;
        }
        self.touch(id);
        self.entries.get(id).map(|e| e.embedding.clone())
    }

    pub fn contains(&mut self, id: &str) -> bool {
        if self.entries.contains_key(id) {
            self.touch(id);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the cache to `path` as the `{version, entries}` JSON
    /// schema. Entries are written in recency order purely for
    /// deterministic diffs; order has no semantic meaning on load.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        let entries = self
            .recency
            .iter()
            .filter_map(|id| self.entries.get(id).cloned())
            .collect();
        let file = CacheFile { version: SCHEMA_VERSION, entries };
        let json = serde_json::to_string_pretty(&file)?;

        // Write-then-rename: a crash mid-write leaves the stale temp file
        // behind, never a half-written `path`.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)
    }

    /// Loads from `path`, recovering to an empty cache on any read or
    /// parse failure (corruption is not propagated as an error; the
    /// caller gets a usable, if cold, cache and the file is overwritten
    /// on the next `save`).
    pub fn load(path: impl AsRef<Path>, max_entries: usize) -> Self {
        let mut cache = EmbeddingCache::new(max_entries);
        let Ok(raw) = std::fs::read_to_string(path) else { return cache };
        let Ok(file) = serde_json::from_str::<CacheFile>(&raw) else { return cache };
        for entry in file.entries {
            cache.entries.insert(entry.id.clone(), entry.clone());
            cache.recency.push(entry.id);
        }
        cache.evict_if_needed();
        cache
    }
}

/// Convenience wrapper binding an [`EmbeddingCache`] to its on-disk
/// location, mirroring the scoped-resource pattern: callers load once,
/// mutate in memory, and `save` explicitly on every exit path.
pub struct PersistentCache {
    path: PathBuf,
    pub cache: EmbeddingCache,
}

impl PersistentCache {
    pub fn open(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        let path = path.into();
        let cache = EmbeddingCache::load(&path, max_entries);
        PersistentCache { path, cache }
    }

    pub fn save(&self) -> std::io::Result<()> {
        self.cache.save(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(v: f32) -> Vec<f32> {
        vec![v; EMBEDDING_DIMENSIONS]
    }

    #[test]
    fn put_get_round_trip_preserves_vector() {
        let mut cache = EmbeddingCache::new(10);
        cache.put("a", "h1", vec_of(1.0));
        assert_eq!(cache.get("a", "h1"), Some(vec_of(1.0)));
    }

    #[test]
    fn hash_mismatch_evicts_and_returns_none() {
        let mut cache = EmbeddingCache::new(10);
        cache.put("a", "h1", vec_of(1.0));
        assert_eq!(cache.get("a", "h2"), None);
        assert!(!cache.contains("a"));
    }

    #[test]
    fn lru_eviction_keeps_most_recently_used() {
        let mut cache = EmbeddingCache::new(2);
        cache.put("a", "h", vec_of(1.0));
        cache.put("b", "h", vec_of(2.0));
        cache.get("a", "h");
        cache.put("c", "h", vec_of(3.0));
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut cache = EmbeddingCache::new(10);
        cache.put("a", "h1", vec_of(1.0));
        cache.put("b", "h2", vec_of(2.0));
        cache.save(&path).unwrap();

        let mut reloaded = EmbeddingCache::load(&path, 10);
        assert_eq!(reloaded.get("a", "h1"), Some(vec_of(1.0)));
        assert_eq!(reloaded.get("b", "h2"), Some(vec_of(2.0)));
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn load_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();
        let cache = EmbeddingCache::load(&path, 10);
        assert!(cache.is_empty());
    }

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"world"));
    }
}
