//! Read-through dataset cache.
//!
//! Tables are keyed by the SHA-256 of the raw input bytes, so repeated
//! interactions with the same upload skip re-parsing. Invalidation is
//! explicit: call [`DatasetCache::invalidate`] or [`DatasetCache::clear`]
//! when a new file replaces the old one.
//!
//! ```
//! use incident_insight::cache::DatasetCache;
//! use incident_insight::loader::DatasetLoader;
//!
//! let cache = DatasetCache::new();
//! let loader = DatasetLoader::default();
//! let csv = b"Year,Incidents\n2020,10\n2021,12\n";
//!
//! let first = cache.load(csv, &loader).unwrap();
//! let second = cache.load(csv, &loader).unwrap();
//! assert!(std::sync::Arc::ptr_eq(&first, &second));
//! assert_eq!(cache.len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};

use crate::dataframe::DataFrame;
use crate::error::InsightError;
use crate::loader::DatasetLoader;

/// Maximum number of tables held (eviction: oldest insertion).
const DEFAULT_CAPACITY: usize = 8;

struct CacheInner {
    tables: HashMap<String, Entry>,
    capacity: usize,
    next_seq: u64,
}

struct Entry {
    table: Arc<DataFrame>,
    seq: u64,
}

/// Content-addressed cache of parsed tables.
pub struct DatasetCache {
    inner: Mutex<CacheInner>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Cache holding at most `capacity` tables (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                tables: HashMap::new(),
                capacity: capacity.max(1),
                next_seq: 0,
            }),
        }
    }

    /// Hex SHA-256 of the raw input, used as the cache key.
    pub fn content_key(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Returns the cached table for `bytes`, parsing and inserting it if
    /// absent. Parse failures are not cached.
    pub fn load(&self, bytes: &[u8], loader: &DatasetLoader) -> Result<Arc<DataFrame>, InsightError> {
        let key = Self::content_key(bytes);
        if let Some(table) = self.get(&key) {
            tracing::debug!(key = %key, "dataset cache hit");
            return Ok(table);
        }

        let table = Arc::new(loader.load_bytes(bytes)?);
        let mut inner = self.lock();

        // Another caller may have inserted the same content meanwhile.
        if let Some(existing) = inner.tables.get(&key) {
            return Ok(Arc::clone(&existing.table));
        }

        if inner.tables.len() >= inner.capacity {
            if let Some(oldest) = inner
                .tables
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone())
            {
                inner.tables.remove(&oldest);
                tracing::info!(evicted = %oldest, "dataset cache eviction");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.tables.insert(
            key.clone(),
            Entry {
                table: Arc::clone(&table),
                seq,
            },
        );
        tracing::info!(key = %key, rows = table.row_count(), "dataset cached");
        Ok(table)
    }

    pub fn get(&self, key: &str) -> Option<Arc<DataFrame>> {
        self.lock().tables.get(key).map(|e| Arc::clone(&e.table))
    }

    /// Drops one entry. Returns `true` if it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().tables.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().tables.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // A panic mid-insert leaves the map consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &[u8] = b"Year,Incidents\n2020,10\n2021,12\n";
    const B: &[u8] = b"Year,Incidents\n2020,99\n";
    const C: &[u8] = b"Region,Incidents\nAsia,1\n";

    #[test]
    fn key_is_stable_hex_sha256() {
        let key = DatasetCache::content_key(b"");
        assert_eq!(
            key,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(DatasetCache::content_key(A), DatasetCache::content_key(B));
    }

    #[test]
    fn hit_returns_same_table() {
        let cache = DatasetCache::new();
        let loader = DatasetLoader::default();
        let first = cache.load(A, &loader).unwrap();
        let second = cache.load(A, &loader).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.column_names(), &["Ano", "Incidentes"]);
    }

    #[test]
    fn invalidate_forces_reparse() {
        let cache = DatasetCache::new();
        let loader = DatasetLoader::default();
        let first = cache.load(A, &loader).unwrap();
        assert!(cache.invalidate(&DatasetCache::content_key(A)));
        assert!(!cache.invalidate(&DatasetCache::content_key(A)));
        let second = cache.load(A, &loader).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let cache = DatasetCache::with_capacity(2);
        let loader = DatasetLoader::default();
        cache.load(A, &loader).unwrap();
        cache.load(B, &loader).unwrap();
        cache.load(C, &loader).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&DatasetCache::content_key(A)).is_none());
        assert!(cache.get(&DatasetCache::content_key(C)).is_some());
    }

    #[test]
    fn parse_errors_are_not_cached() {
        let cache = DatasetCache::new();
        let loader = DatasetLoader::default();
        assert!(cache.load(b"a,b\n1\n", &loader).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_empties_cache() {
        let cache = DatasetCache::new();
        cache.load(A, &DatasetLoader::default()).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
