//! Explicit memoization for expensive loads (datasets, model artifacts).
//!
//! Entries are keyed by name plus an input fingerprint; a changed fingerprint
//! replaces the stale entry on the next load. The cache is an ordinary value
//! handed to whoever needs it, so tests can inject a fresh one.

use color_eyre::Result;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

/// Identity of an input at load time: path, size, and mtime hashed together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Fingerprint a file on disk. Content changes that alter size or mtime
    /// produce a different fingerprint.
    pub fn for_path(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path)?;
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        meta.len().hash(&mut hasher);
        if let Ok(modified) = meta.modified() {
            if let Ok(d) = modified.duration_since(UNIX_EPOCH) {
                d.as_nanos().hash(&mut hasher);
            }
        }
        Ok(Self(hasher.finish()))
    }

    /// Fingerprint an in-memory argument tuple (anything hashable).
    pub fn for_value<T: Hash>(value: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Single-value-per-key memo cache with explicit invalidation.
pub struct MemoCache<V> {
    entries: HashMap<String, (Fingerprint, Arc<V>)>,
}

impl<V> Default for MemoCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> MemoCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key` when the fingerprint still matches,
    /// otherwise computes, stores, and returns a fresh one. A mismatched
    /// fingerprint evicts the stale entry even if `load` then fails.
    pub fn get_or_load<F>(&mut self, key: &str, fingerprint: Fingerprint, load: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some((stored, value)) = self.entries.get(key) {
            if *stored == fingerprint {
                return Ok(Arc::clone(value));
            }
            self.entries.remove(key);
        }
        let value = Arc::new(load()?);
        self.entries
            .insert(key.to_string(), (fingerprint, Arc::clone(&value)));
        Ok(value)
    }

    /// Drops the entry for `key`, if any.
    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn caches_by_fingerprint() {
        let mut cache: MemoCache<i32> = MemoCache::new();
        let fp = Fingerprint::for_value(&"input-a");
        let mut loads = 0;
        for _ in 0..3 {
            let v = cache
                .get_or_load("model", fp, || {
                    loads += 1;
                    Ok(42)
                })
                .unwrap();
            assert_eq!(*v, 42);
        }
        assert_eq!(loads, 1);
    }

    #[test]
    fn changed_fingerprint_reloads() {
        let mut cache: MemoCache<i32> = MemoCache::new();
        let a = Fingerprint::for_value(&"a");
        let b = Fingerprint::for_value(&"b");
        cache.get_or_load("data", a, || Ok(1)).unwrap();
        let v = cache.get_or_load("data", b, || Ok(2)).unwrap();
        assert_eq!(*v, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_forces_reload() {
        let mut cache: MemoCache<i32> = MemoCache::new();
        let fp = Fingerprint::for_value(&"x");
        cache.get_or_load("data", fp, || Ok(1)).unwrap();
        cache.invalidate("data");
        let v = cache.get_or_load("data", fp, || Ok(2)).unwrap();
        assert_eq!(*v, 2);
    }

    #[test]
    fn path_fingerprint_tracks_content_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        let first = Fingerprint::for_path(&path).unwrap();
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "3,4").unwrap();
        drop(f);
        let second = Fingerprint::for_path(&path).unwrap();
        assert_ne!(first, second);
    }
}
