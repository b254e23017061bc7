//! Language fallback and reference aliasing through the cache.
//!
//! A read probes the requested language, each broader tag, then the default
//! language. When a broader language answers, the requested slot becomes a
//! reference to the slot that answered, and later reads never re-query.

use std::sync::Arc;

use lexis_cache::{
    CacheStore, CacheValue, DictionaryCache, InMemoryDictionaryStore, LanguageFallbackResolver,
    MemoryCacheStore, QueryProvider, ReferenceIndirection,
};
use lexis_core::{DictionaryConfig, DictionaryEntry};
use lexis_test_utils::assertions::{assert_materialized, assert_reference};
use lexis_test_utils::{fixtures, init_tracing, CountingQueryProvider};
use proptest::prelude::*;

type Counting = CountingQueryProvider<InMemoryDictionaryStore>;

struct Harness {
    cache: DictionaryCache<MemoryCacheStore, Counting>,
    store: Arc<MemoryCacheStore>,
    db: Arc<Counting>,
}

fn harness_with(config: DictionaryConfig) -> Harness {
    init_tracing();
    let store = Arc::new(MemoryCacheStore::new());
    let db = Arc::new(CountingQueryProvider::new(Arc::new(fixtures::seeded_store())));
    let cache = DictionaryCache::new(Arc::clone(&store), Arc::clone(&db), &config);
    Harness { cache, store, db }
}

fn harness() -> Harness {
    harness_with(DictionaryConfig::default())
}

/// What the cache must answer, computed by walking the fallback chain
/// against the query provider alone.
fn direct_by_key(
    db: &InMemoryDictionaryStore,
    language: Option<&str>,
    key: &str,
) -> Vec<DictionaryEntry> {
    for candidate in LanguageFallbackResolver::new().candidates(language) {
        let rows = db.query_by_key(candidate.as_deref(), key).unwrap_or_default();
        if !rows.is_empty() {
            return rows;
        }
    }
    Vec::new()
}

// ============================================================================
// FALLBACK ORDERING
// ============================================================================

#[test]
fn test_fallback_probes_most_specific_first() {
    let mut probed = Vec::new();
    let resolved = LanguageFallbackResolver::new()
        .resolve(Some("zh_cn_trad"), |requested, candidate| {
            assert_eq!(requested, Some("zh_cn_trad"));
            probed.push(candidate.map(str::to_string));
            Ok(Vec::<DictionaryEntry>::new())
        })
        .unwrap();

    assert_eq!(
        probed,
        vec![
            Some("zh_cn_trad".to_string()),
            Some("zh_cn".to_string()),
            Some("zh".to_string()),
            None
        ]
    );
    assert!(resolved.value.is_empty());
    assert_eq!(resolved.resolved, None);
}

#[test]
fn test_fallback_stops_at_first_non_empty_language() {
    let h = harness();
    let entries = h.cache.load_by_key(Some("zh-CN-trad"), "user.gender").unwrap();

    assert_eq!(entries[0].text.as_deref(), Some("男"));
    // zh_cn_trad (no table), zh_cn (empty), zh (answers); default never probed.
    assert_eq!(h.db.key_calls(), 3);
}

#[test]
fn test_default_language_answers_last() {
    let h = harness();
    let entries = h.cache.load_by_key(Some("en"), "site.title").unwrap();
    assert_eq!(entries[0].text.as_deref(), Some("Lexis"));

    let keys = h.cache.keys();
    assert_reference(
        h.store.as_ref(),
        &keys.build("site.title", Some("en")),
        &keys.build("site.title", None),
    );
}

#[test]
fn test_fixed_locale_ignores_requested_language() {
    let h = harness_with(DictionaryConfig {
        fixed_locale: Some("zh".to_string()),
        ..DictionaryConfig::default()
    });

    let entries = h.cache.load_by_key(Some("en"), "user.gender").unwrap();
    assert_eq!(entries[0].text.as_deref(), Some("男"));
    assert_eq!(h.db.key_calls(), 1);
    assert!(!h.store.exists(&h.cache.keys().build("user.gender", Some("en"))).unwrap());
}

// ============================================================================
// ALIAS CORRECTNESS
// ============================================================================

#[test]
fn test_fallback_slot_becomes_reference() {
    let h = harness();
    let first = h.cache.load_by_key(Some("zh_cn"), "user.gender").unwrap();

    let keys = h.cache.keys();
    let specific = keys.build("user.gender", Some("zh_cn"));
    let broader = keys.build("user.gender", Some("zh"));
    assert_reference(h.store.as_ref(), &specific, &broader);
    assert_materialized(h.store.as_ref(), &broader);

    let references = ReferenceIndirection::new(Arc::clone(&h.store));
    let through_reference = references.materialize(&specific).unwrap().unwrap();
    assert_eq!(through_reference.hops, 1);
    assert_eq!(
        Some(through_reference.value),
        h.store.get(&broader).unwrap()
    );
    assert_eq!(CacheValue::Entries(first), h.store.get(&broader).unwrap().unwrap());
}

#[test]
fn test_second_read_does_not_requery() {
    let h = harness();
    let first = h.cache.load_by_key(Some("zh_cn"), "user.gender").unwrap();
    let calls = h.db.total_calls();

    let second = h.cache.load_by_key(Some("zh_cn"), "user.gender").unwrap();
    assert_eq!(first, second);
    assert_eq!(h.db.total_calls(), calls);
}

#[test]
fn test_reference_targets_terminal_slot() {
    let h = harness();
    // zh_cn falls to the default; zh_cn_trad then aliases straight to the
    // default slot rather than chaining through zh_cn.
    h.cache.load_by_key(Some("zh_cn"), "site.title").unwrap();
    h.cache.load_by_key(Some("zh_cn_trad"), "site.title").unwrap();

    let keys = h.cache.keys();
    let default = keys.build("site.title", None);
    assert_reference(h.store.as_ref(), &keys.build("site.title", Some("zh_cn")), &default);
    // zh was probed on the way and holds its own empty answer.
    assert_eq!(
        h.store.get(&keys.build("site.title", Some("zh"))).unwrap(),
        Some(CacheValue::Entries(Vec::new()))
    );
    assert_reference(
        h.store.as_ref(),
        &keys.build("site.title", Some("zh_cn_trad")),
        &default,
    );
}

#[test]
fn test_load_all_and_expand_alias_like_key_slots() {
    let h = harness();
    let all = h.cache.load_all(Some("zh_cn")).unwrap();
    assert_eq!(all.len(), 2);

    let tree = h.cache.expand_all(Some("zh_cn")).unwrap();
    assert_eq!(tree["user"]["gender"][0]["text"], "男");

    let keys = h.cache.keys();
    assert_reference(h.store.as_ref(), &keys.all_key(Some("zh_cn")), &keys.all_key(Some("zh")));
    assert_reference(
        h.store.as_ref(),
        &keys.expand_key(Some("zh_cn")),
        &keys.expand_key(Some("zh")),
    );

    let calls = h.db.total_calls();
    h.cache.load_all(Some("zh_cn")).unwrap();
    h.cache.expand_all(Some("zh_cn")).unwrap();
    assert_eq!(h.db.total_calls(), calls);
}

#[test]
fn test_languages_slot_is_global() {
    let h = harness();
    let first = h.cache.load_languages().unwrap();
    let second = h.cache.load_languages().unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert_eq!(h.db.language_calls(), 1);
}

// ============================================================================
// TRANSPARENCY
// ============================================================================

#[test]
fn test_indirection_never_changes_the_answer() {
    let h = harness();
    let languages = [Some("zh_cn_trad"), Some("zh_cn"), Some("zh"), Some("en"), Some("fr"), None];
    let keys = ["user.gender", "site.title", "site.footer", "missing.key"];

    // Two passes: the first populates payloads and references, the second
    // is served from them.
    for _ in 0..2 {
        for language in languages {
            for key in keys {
                let cached = h.cache.load_by_key(language, key).unwrap();
                let direct = direct_by_key(h.db.inner(), language, key);
                assert_eq!(cached, direct, "{:?} / {}", language, key);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_cached_answer_matches_direct_walk(
        order in proptest::collection::vec(0usize..6, 1..12)
    ) {
        let h = harness();
        let languages = [Some("zh_cn_trad"), Some("zh_cn"), Some("zh"), Some("en"), Some("fr"), None];
        for index in order {
            let language = languages[index];
            let cached = h.cache.load_by_key(language, "user.gender").unwrap();
            prop_assert_eq!(cached, direct_by_key(h.db.inner(), language, "user.gender"));
        }
    }
}
