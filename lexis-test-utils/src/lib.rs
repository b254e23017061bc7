//! Lexis Test Utilities
//!
//! Shared test infrastructure for the Lexis workspace:
//! - Proptest generators for entries, keys and language tags
//! - A call-counting query provider
//! - Fixtures for common dictionary layouts
//! - Custom assertions for Lexis errors and cache slots

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Re-export core types for convenience
pub use lexis_cache::{
    CacheStore, CacheValue, DictionaryCache, DictionaryManager, InMemoryDictionaryStore,
    MemoryCacheStore, QueryError, QueryProvider,
};
pub use lexis_core::{
    BackendError, CatalogError, DictionaryConfig, DictionaryEntry, EntryId, EntryType,
    LanguageEntry, LexisError, LexisResult, Timestamp, ValidationError,
};

// ============================================================================
// MOCK PROVIDERS
// ============================================================================

/// Query provider that counts calls per method before delegating.
pub struct CountingQueryProvider<Q: QueryProvider + ?Sized> {
    inner: Arc<Q>,
    all_calls: AtomicUsize,
    key_calls: AtomicUsize,
    ids_calls: AtomicUsize,
    language_calls: AtomicUsize,
}

impl<Q: QueryProvider + ?Sized> CountingQueryProvider<Q> {
    pub fn new(inner: Arc<Q>) -> Self {
        Self {
            inner,
            all_calls: AtomicUsize::new(0),
            key_calls: AtomicUsize::new(0),
            ids_calls: AtomicUsize::new(0),
            language_calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &Arc<Q> {
        &self.inner
    }

    pub fn all_calls(&self) -> usize {
        self.all_calls.load(Ordering::SeqCst)
    }

    pub fn key_calls(&self) -> usize {
        self.key_calls.load(Ordering::SeqCst)
    }

    pub fn ids_calls(&self) -> usize {
        self.ids_calls.load(Ordering::SeqCst)
    }

    pub fn language_calls(&self) -> usize {
        self.language_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.all_calls() + self.key_calls() + self.ids_calls() + self.language_calls()
    }

    pub fn reset(&self) {
        for counter in [
            &self.all_calls,
            &self.key_calls,
            &self.ids_calls,
            &self.language_calls,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }
}

impl<Q: QueryProvider + ?Sized> QueryProvider for CountingQueryProvider<Q> {
    fn query_all(&self, language: Option<&str>) -> Result<Vec<DictionaryEntry>, QueryError> {
        self.all_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.query_all(language)
    }

    fn query_by_key(
        &self,
        language: Option<&str>,
        key: &str,
    ) -> Result<Vec<DictionaryEntry>, QueryError> {
        self.key_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.query_by_key(language, key)
    }

    fn query_by_ids(
        &self,
        language: Option<&str>,
        ids: &[EntryId],
    ) -> Result<Vec<DictionaryEntry>, QueryError> {
        self.ids_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.query_by_ids(language, ids)
    }

    fn query_languages(&self) -> Result<Vec<LanguageEntry>, QueryError> {
        self.language_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.query_languages()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Lexis entity types.

    use super::*;
    use proptest::prelude::*;

    /// A normalized language tag with up to two extra subtags.
    pub fn arb_language_tag() -> impl Strategy<Value = String> {
        "[a-z]{2,3}(_[a-z]{2,4}){0,2}".prop_filter("reserved slot name", |tag| {
            !lexis_core::language::RESERVED_TAGS.contains(&tag.as_str())
        })
    }

    /// A dotted logical key that is not one of the reserved slot names.
    pub fn arb_logical_key() -> impl Strategy<Value = String> {
        "[a-z]{1,8}(\\.[a-z]{1,8}){0,3}".prop_filter("reserved slot name", |key| {
            !matches!(key.as_str(), "all" | "expand" | "languages")
        })
    }

    /// Generate a Timestamp (DateTime<Utc>).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-2030
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(chrono::Utc::now)
        })
    }

    pub fn arb_entry_type() -> impl Strategy<Value = EntryType> {
        prop_oneof![Just(EntryType::Text), Just(EntryType::Enum)]
    }

    /// A stored entry under `key` with the given id.
    pub fn arb_entry_for(key: String, id: EntryId) -> impl Strategy<Value = DictionaryEntry> {
        (
            arb_entry_type(),
            0i32..100,
            proptest::option::of("[a-z]{1,8}"),
            "[A-Za-z ]{1,16}",
            any::<bool>(),
            arb_timestamp(),
        )
            .prop_map(move |(entry_type, code, alias, text, enabled, created)| {
                let mut entry = match entry_type {
                    EntryType::Text => DictionaryEntry::text(key.clone(), text),
                    EntryType::Enum => DictionaryEntry::enumeration(key.clone(), code, text),
                };
                entry.alias = alias;
                entry.enabled = enabled;
                entry.create_time = Some(created);
                entry.with_id(id)
            })
    }

    pub fn arb_entry() -> impl Strategy<Value = DictionaryEntry> {
        (arb_logical_key(), 1i64..1_000_000).prop_flat_map(|(key, id)| arb_entry_for(key, id))
    }

    /// Up to `max` entries with distinct ids.
    pub fn arb_entries(max: usize) -> impl Strategy<Value = Vec<DictionaryEntry>> {
        prop::collection::vec(arb_entry(), 0..=max).prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(i, entry)| entry.with_id(i as EntryId + 1))
                .collect()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built dictionaries for common testing scenarios.

    use super::*;

    /// `user.gender` as two enabled ENUM entries and one disabled.
    pub fn gender_entries(first_id: EntryId) -> Vec<DictionaryEntry> {
        vec![
            DictionaryEntry::enumeration("user.gender", 1, "Male")
                .with_id(first_id)
                .with_alias("male"),
            DictionaryEntry::enumeration("user.gender", 2, "Female")
                .with_id(first_id + 1)
                .with_alias("female"),
            DictionaryEntry::enumeration("user.gender", 3, "Unknown")
                .with_id(first_id + 2)
                .with_alias("unknown")
                .with_enabled(false),
        ]
    }

    /// The same gender group in Chinese.
    pub fn gender_entries_zh(first_id: EntryId) -> Vec<DictionaryEntry> {
        vec![
            DictionaryEntry::enumeration("user.gender", 1, "男")
                .with_id(first_id)
                .with_alias("male"),
            DictionaryEntry::enumeration("user.gender", 2, "女")
                .with_id(first_id + 1)
                .with_alias("female"),
        ]
    }

    pub fn site_entries(first_id: EntryId) -> Vec<DictionaryEntry> {
        vec![
            DictionaryEntry::text("site.title", "Lexis").with_id(first_id),
            DictionaryEntry::text("site.footer", "All rights reserved").with_id(first_id + 1),
        ]
    }

    /// Catalog of `en`, `zh` and `zh_cn`, in that order.
    pub fn languages() -> Vec<LanguageEntry> {
        let mut catalog = vec![
            LanguageEntry::new("en", "English").with_order_index(1),
            LanguageEntry::new("zh", "中文").with_order_index(2),
            LanguageEntry::new("zh-CN", "简体中文").with_order_index(3),
        ];
        for (i, language) in catalog.iter_mut().enumerate() {
            language.id = Some(i as EntryId + 1);
        }
        catalog
    }

    /// A store with the default and `zh` dictionaries and the catalog of
    /// [`languages`]. `en` and `zh_cn` are provisioned but empty.
    pub fn seeded_store() -> InMemoryDictionaryStore {
        let store = InMemoryDictionaryStore::new();
        let mut default = gender_entries(1);
        default.extend(site_entries(10));
        store.seed(None, default);
        store.seed(Some("zh"), gender_entries_zh(100));
        store.provision(Some("en"));
        store.provision(Some("zh_cn"));
        store.seed_languages(languages());
        store
    }

    /// Configuration that skips the startup preload.
    pub fn quiet_config() -> DictionaryConfig {
        DictionaryConfig {
            preload_default: false,
            ..DictionaryConfig::default()
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for Lexis-specific validation.

    use super::*;

    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &LexisResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &LexisResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    /// Assert that a LexisResult is a validation error.
    #[track_caller]
    pub fn assert_invalid_argument<T: std::fmt::Debug>(result: &LexisResult<T>) {
        match result {
            Err(e) if e.is_invalid_argument() => {}
            other => panic!("Expected invalid argument, got: {:?}", other),
        }
    }

    /// Assert that a LexisResult is a backend error.
    #[track_caller]
    pub fn assert_backend<T: std::fmt::Debug>(result: &LexisResult<T>) {
        match result {
            Err(e) if e.is_backend() => {}
            other => panic!("Expected backend error, got: {:?}", other),
        }
    }

    /// Assert that a LexisResult is a catalog error.
    #[track_caller]
    pub fn assert_catalog_error<T: std::fmt::Debug>(result: &LexisResult<T>) {
        match result {
            Err(LexisError::Catalog(_)) => {}
            other => panic!("Expected Catalog error, got: {:?}", other),
        }
    }

    /// Assert that `key` holds a reference to `target`.
    #[track_caller]
    pub fn assert_reference<S: CacheStore + ?Sized>(store: &S, key: &str, target: &str) {
        match store.get(key) {
            Ok(Some(CacheValue::Reference(found))) => {
                assert_eq!(found, target, "Reference at {} points elsewhere", key)
            }
            other => panic!("Expected reference at {}, got: {:?}", key, other),
        }
    }

    /// Assert that `key` holds a payload rather than a reference.
    #[track_caller]
    pub fn assert_materialized<S: CacheStore + ?Sized>(store: &S, key: &str) {
        match store.get(key) {
            Ok(Some(value)) if !value.is_reference() => {}
            other => panic!("Expected payload at {}, got: {:?}", key, other),
        }
    }

    #[track_caller]
    pub fn assert_absent<S: CacheStore + ?Sized>(store: &S, key: &str) {
        match store.exists(key) {
            Ok(false) => {}
            other => panic!("Expected {} to be absent, got: {:?}", key, other),
        }
    }
}

// ============================================================================
// LOGGING
// ============================================================================

/// Install a fmt subscriber for tests, filtered by `RUST_LOG` (default
/// `warn`). Safe to call from every test.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_seeded_store_fixture() {
        let store = fixtures::seeded_store();
        assert_eq!(store.query_all(None).unwrap().len(), 5);
        assert_eq!(store.query_all(Some("zh")).unwrap().len(), 2);
        assert!(store.query_all(Some("en")).unwrap().is_empty());
        assert_eq!(store.query_languages().unwrap().len(), 3);
    }

    #[test]
    fn test_counting_provider() {
        let counting = CountingQueryProvider::new(Arc::new(fixtures::seeded_store()));
        counting.query_all(None).unwrap();
        counting.query_by_key(None, "user.gender").unwrap();
        counting.query_by_key(Some("zh"), "user.gender").unwrap();
        assert_eq!(counting.all_calls(), 1);
        assert_eq!(counting.key_calls(), 2);
        assert_eq!(counting.total_calls(), 3);

        counting.reset();
        assert_eq!(counting.total_calls(), 0);
    }

    #[test]
    fn test_assertions() {
        let invalid: LexisResult<()> = Err(ValidationError::EmptyKey.into());
        assertions::assert_err(&invalid);
        assertions::assert_invalid_argument(&invalid);

        let backend: LexisResult<()> = Err(BackendError::Query {
            reason: "down".to_string(),
        }
        .into());
        assertions::assert_backend(&backend);
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }

    proptest! {
        #[test]
        fn prop_generated_keys_are_accepted(key in generators::arb_logical_key()) {
            prop_assert!(lexis_cache::validate_logical_key(&key).is_ok());
        }

        #[test]
        fn prop_generated_tags_are_normalized(tag in generators::arb_language_tag()) {
            prop_assert_eq!(lexis_core::normalize_language(&tag).unwrap(), Some(tag.clone()));
        }

        #[test]
        fn prop_generated_entries_have_distinct_ids(entries in generators::arb_entries(12)) {
            let mut ids: Vec<_> = entries.iter().filter_map(|e| e.id).collect();
            ids.dedup();
            prop_assert_eq!(ids.len(), entries.len());
        }
    }
}
