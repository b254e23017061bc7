//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to keep cache slots in a
//! memory-mapped file. Slots survive a restart and are shared by every
//! process on the host that opens the same directory.
//!
//! # Layout
//!
//! One unnamed database, string keys, values are [`CacheValue`] encoded as
//! JSON. All keys of one store share the namespace prefix it was opened
//! with, so suffix scans and `clear` walk a single prefix range.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `get`, `exists` and scans
//! - Write transactions for `set`, `delete`, `delete_by_suffix` and `clear`
//! - Statistics are kept behind a `RwLock`

use std::path::Path;
use std::sync::RwLock;

use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use lexis_core::{BackendError, LexisError, LexisResult};

use super::traits::{CacheStats, CacheStore, CacheValue};

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored bytes could not be decoded.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for LexisError {
    fn from(e: LmdbCacheError) -> Self {
        LexisError::Backend(BackendError::Store {
            backend: "lmdb".to_string(),
            reason: e.to_string(),
        })
    }
}

fn txn_err(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

/// LMDB-backed cache store.
///
/// # Example
///
/// ```ignore
/// use lexis_cache::cache::{CacheStore, LmdbCacheStore};
///
/// let store = LmdbCacheStore::open("/var/cache/lexis", 64, "cacheable:dict:")?;
/// store.set("cacheable:dict:all", value)?;
/// let cached = store.get("cacheable:dict:all")?;
/// ```
pub struct LmdbCacheStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Str, Bytes>,
    /// Prefix shared by every key this store manages.
    namespace: String,
    stats: RwLock<CacheStats>,
}

impl LmdbCacheStore {
    /// Open (or create) a store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    /// * `namespace` - Key prefix scanned by suffix deletes and `clear`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn open<P: AsRef<Path>>(
        path: P,
        max_size_mb: usize,
        namespace: impl Into<String>,
    ) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Self {
            env,
            db,
            namespace: namespace.into(),
            stats: RwLock::new(CacheStats::default()),
        })
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
        }
    }

    fn record_miss(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
        }
    }

    /// Keys under the namespace accepted by `filter`.
    fn collect_keys<F>(&self, filter: F) -> Result<Vec<String>, LmdbCacheError>
    where
        F: Fn(&str) -> bool,
    {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let iter = self
            .db
            .prefix_iter(&rtxn, self.namespace.as_str())
            .map_err(txn_err)?;

        let mut keys = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(txn_err)?;
            if filter(key) {
                keys.push(key.to_string());
            }
        }
        Ok(keys)
    }

    fn delete_keys(&self, keys: &[String]) -> Result<u64, LmdbCacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let mut deleted = 0u64;
        for key in keys {
            if self.db.delete(&mut wtxn, key.as_str()).map_err(txn_err)? {
                deleted += 1;
            }
        }
        wtxn.commit().map_err(txn_err)?;
        Ok(deleted)
    }
}

impl CacheStore for LmdbCacheStore {
    fn backend_name(&self) -> &'static str {
        "lmdb"
    }

    fn get(&self, key: &str) -> LexisResult<Option<CacheValue>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        match self.db.get(&rtxn, key).map_err(txn_err)? {
            Some(bytes) => {
                self.record_hit();
                let value = CacheValue::from_bytes(bytes)
                    .map_err(|e| LmdbCacheError::Deserialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => {
                self.record_miss();
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: CacheValue) -> LexisResult<()> {
        let bytes = value.to_bytes()?;
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.db.put(&mut wtxn, key, &bytes).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(())
    }

    fn exists(&self, key: &str) -> LexisResult<bool> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        Ok(self.db.get(&rtxn, key).map_err(txn_err)?.is_some())
    }

    fn delete(&self, key: &str) -> LexisResult<bool> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let deleted = self.db.delete(&mut wtxn, key).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(deleted)
    }

    fn keys_with_suffix(&self, suffix: &str) -> LexisResult<Vec<String>> {
        Ok(self.collect_keys(|key| key.ends_with(suffix))?)
    }

    fn delete_by_suffix(&self, suffix: &str) -> LexisResult<u64> {
        let keys = self.collect_keys(|key| key.ends_with(suffix))?;
        Ok(self.delete_keys(&keys)?)
    }

    fn clear(&self) -> LexisResult<u64> {
        let keys = self.collect_keys(|_| true)?;
        Ok(self.delete_keys(&keys)?)
    }

    fn stats(&self) -> LexisResult<CacheStats> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let entry_count = self.db.len(&rtxn).map_err(txn_err)?;
        let mut stats = self
            .stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default();
        stats.entry_count = entry_count;
        Ok(stats)
    }
}

// ============================================================================
// TESTS
// ============================================================================
