//! Process-local cache store.
//!
//! Backed by a `DashMap`, so concurrent readers and writers need no external
//! locking. Contents are lost when the process exits.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use lexis_core::LexisResult;

use super::traits::{CacheStats, CacheStore, CacheValue};

/// In-memory cache store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    slots: DashMap<String, CacheValue>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Snapshot of every key, for diagnostics and tests.
    pub fn keys(&self) -> Vec<String> {
        self.slots.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl CacheStore for MemoryCacheStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> LexisResult<Option<CacheValue>> {
        match self.slots.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.value().clone()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: CacheValue) -> LexisResult<()> {
        self.slots.insert(key.to_string(), value);
        Ok(())
    }

    fn exists(&self, key: &str) -> LexisResult<bool> {
        Ok(self.slots.contains_key(key))
    }

    fn delete(&self, key: &str) -> LexisResult<bool> {
        Ok(self.slots.remove(key).is_some())
    }

    fn keys_with_suffix(&self, suffix: &str) -> LexisResult<Vec<String>> {
        Ok(self
            .slots
            .iter()
            .filter(|entry| entry.key().ends_with(suffix))
            .map(|entry| entry.key().clone())
            .collect())
    }

    fn delete_by_suffix(&self, suffix: &str) -> LexisResult<u64> {
        let mut removed = 0u64;
        self.slots.retain(|key, _| {
            let keep = !key.ends_with(suffix);
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    fn clear(&self) -> LexisResult<u64> {
        let count = self.slots.len() as u64;
        self.slots.clear();
        Ok(count)
    }

    fn stats(&self) -> LexisResult<CacheStats> {
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.slots.len() as u64,
        })
    }
}
