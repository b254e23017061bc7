//! Cache store trait and the values it holds.
//!
//! A store is a flat string-keyed namespace. Every slot holds one
//! [`CacheValue`]: a materialized payload or a reference to another slot.

use lexis_core::{BackendError, DictionaryEntry, LanguageEntry, LexisResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Nested map built from dot-namespaced entries.
pub type DictionaryTree = Map<String, Value>;

/// Value of one cache slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CacheValue {
    Entries(Vec<DictionaryEntry>),
    Tree(DictionaryTree),
    Languages(Vec<LanguageEntry>),
    /// Full cache key of the slot holding the payload.
    Reference(String),
}

impl CacheValue {
    pub fn is_reference(&self) -> bool {
        matches!(self, CacheValue::Reference(_))
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            CacheValue::Reference(target) => Some(target),
            _ => None,
        }
    }

    /// True for an empty payload. A reference is never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            CacheValue::Entries(entries) => entries.is_empty(),
            CacheValue::Tree(tree) => tree.is_empty(),
            CacheValue::Languages(languages) => languages.is_empty(),
            CacheValue::Reference(_) => false,
        }
    }

    pub fn into_entries(self) -> Option<Vec<DictionaryEntry>> {
        match self {
            CacheValue::Entries(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn into_tree(self) -> Option<DictionaryTree> {
        match self {
            CacheValue::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn into_languages(self) -> Option<Vec<LanguageEntry>> {
        match self {
            CacheValue::Languages(languages) => Some(languages),
            _ => None,
        }
    }

    /// Encode for stores that persist bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BackendError> {
        serde_json::to_vec(self).map_err(|e| BackendError::Serialization {
            reason: e.to_string(),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BackendError> {
        serde_json::from_slice(bytes).map_err(|e| BackendError::Serialization {
            reason: e.to_string(),
        })
    }
}

/// Cache store trait for pluggable backends.
///
/// Implementations must be safe to call from many threads without external
/// locking. Per-key operations are last-writer-wins; nothing spans keys.
pub trait CacheStore: Send + Sync {
    /// Short name used in logs and errors.
    fn backend_name(&self) -> &'static str;

    fn get(&self, key: &str) -> LexisResult<Option<CacheValue>>;

    fn set(&self, key: &str, value: CacheValue) -> LexisResult<()>;

    fn exists(&self, key: &str) -> LexisResult<bool>;

    /// Remove a slot. Returns true if something was removed.
    fn delete(&self, key: &str) -> LexisResult<bool>;

    /// Every key in the store's namespace ending with `suffix`. Order is
    /// unspecified.
    fn keys_with_suffix(&self, suffix: &str) -> LexisResult<Vec<String>>;

    /// Remove every key ending with `suffix`, returning how many went away.
    fn delete_by_suffix(&self, suffix: &str) -> LexisResult<u64> {
        let mut deleted = 0;
        for key in self.keys_with_suffix(suffix)? {
            if self.delete(&key)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Remove every key in the store's namespace.
    fn clear(&self) -> LexisResult<u64>;

    fn stats(&self) -> LexisResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of `get` calls that found a slot.
    pub hits: u64,
    /// Number of `get` calls that found nothing.
    pub misses: u64,
    /// Number of slots currently stored.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
