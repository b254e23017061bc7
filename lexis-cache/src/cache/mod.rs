//! Cache layer: stores, keys, language fallback and reference slots.
//!
//! # Slots
//!
//! Every cached value lives in a slot addressed by a logical key and an
//! optional language (see [`CacheKeyBuilder`]). A slot holds either a
//! payload or a reference to the slot of a broader language that produced
//! the same answer (see [`ReferenceIndirection`]).
//!
//! # Backends
//!
//! [`CacheStore`] has three implementations with the same observable
//! semantics:
//! - [`MemoryCacheStore`]: process-local `DashMap`
//! - [`RedisCacheStore`]: shared remote store
//! - [`LmdbCacheStore`]: memory-mapped file, shared on one host
//!
//! [`open_store`] picks one from a [`DictionaryConfig`].

pub mod cache_key;
pub mod fallback;
pub mod lmdb_backend;
pub mod memory_backend;
pub mod redis_backend;
pub mod reference;
pub mod traits;

use std::sync::Arc;

use lexis_core::{DictionaryConfig, LexisResult, StoreBackend};

pub use cache_key::{validate_logical_key, CacheKeyBuilder, Slot};
pub use fallback::{FallbackResult, LanguageFallbackResolver, Resolved};
pub use lmdb_backend::{LmdbCacheError, LmdbCacheStore};
pub use memory_backend::MemoryCacheStore;
pub use redis_backend::{RedisCacheError, RedisCacheStore};
pub use reference::{Materialized, ReferenceIndirection};
pub use traits::{CacheStats, CacheStore, CacheValue, DictionaryTree};

/// Open the store selected by `config.backend`.
pub fn open_store(config: &DictionaryConfig) -> LexisResult<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryCacheStore::new()),
        StoreBackend::Redis => Arc::new(RedisCacheStore::open(
            &config.redis_url,
            config.cache_key_prefix.clone(),
        )?),
        StoreBackend::Lmdb => Arc::new(LmdbCacheStore::open(
            &config.lmdb_path,
            config.lmdb_max_size_mb,
            config.cache_key_prefix.clone(),
        )?),
    };
    tracing::info!(backend = store.backend_name(), "Opened dictionary cache store");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_store_memory_default() {
        let store = open_store(&DictionaryConfig::default()).unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[test]
    fn test_open_store_lmdb() {
        let dir = TempDir::new().unwrap();
        let config = DictionaryConfig {
            backend: StoreBackend::Lmdb,
            lmdb_path: dir.path().to_string_lossy().into_owned(),
            lmdb_max_size_mb: 10,
            ..Default::default()
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.backend_name(), "lmdb");
    }

    #[test]
    fn test_open_store_redis_is_lazy() {
        let config = DictionaryConfig {
            backend: StoreBackend::Redis,
            ..Default::default()
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.backend_name(), "redis");
    }
}
