//! Concurrent readers racing write-through reloads on one cache.
//!
//! A reader that lands between a reload's delete and its recompute simply
//! recomputes itself, so every read sees the persisted answer.

use std::sync::Arc;
use std::thread;

use lexis_cache::{
    CacheStore, CacheValue, DictionaryCache, InMemoryDictionaryStore, MemoryCacheStore,
    QueryProvider, ReferenceIndirection,
};
use lexis_core::DictionaryConfig;
use lexis_test_utils::{fixtures, init_tracing};

const READERS: usize = 6;
const RELOADERS: usize = 2;
const ITERATIONS: usize = 200;

type Cache = DictionaryCache<MemoryCacheStore, InMemoryDictionaryStore>;

fn setup() -> (Arc<Cache>, Arc<MemoryCacheStore>, Arc<InMemoryDictionaryStore>) {
    init_tracing();
    let store = Arc::new(MemoryCacheStore::new());
    let db = Arc::new(fixtures::seeded_store());
    let cache = Arc::new(DictionaryCache::new(
        Arc::clone(&store),
        Arc::clone(&db),
        &DictionaryConfig::default(),
    ));
    (cache, store, db)
}

#[test]
fn test_readers_racing_reloads_always_see_persisted_answer() {
    let (cache, store, db) = setup();
    let expected = db.query_by_key(Some("zh"), "user.gender").unwrap();
    assert_eq!(expected.len(), 2);

    thread::scope(|scope| {
        for reader in 0..READERS {
            let cache = Arc::clone(&cache);
            let expected = expected.clone();
            scope.spawn(move || {
                for i in 0..ITERATIONS {
                    if (reader + i) % 3 == 0 {
                        let tree = cache.expand_all(Some("zh_cn")).unwrap();
                        assert_eq!(tree["user"]["gender"][0]["text"], "男");
                    } else {
                        let entries = cache.load_by_key(Some("zh_cn"), "user.gender").unwrap();
                        assert_eq!(entries, expected);
                    }
                }
            });
        }
        for reloader in 0..RELOADERS {
            let cache = Arc::clone(&cache);
            scope.spawn(move || {
                let language = if reloader % 2 == 0 { "zh" } else { "zh_cn" };
                for _ in 0..ITERATIONS {
                    cache.reload_key_if_necessary(Some(language), "user.gender").unwrap();
                    cache.reload_all_if_necessary(Some(language)).unwrap();
                    cache.reload_expand_all_if_necessary(Some(language)).unwrap();
                }
            });
        }
    });

    let keys = cache.keys();
    let specific = keys.build("user.gender", Some("zh_cn"));
    let broader = keys.build("user.gender", Some("zh"));
    assert_eq!(
        store.get(&specific).unwrap(),
        Some(CacheValue::Reference(broader.clone()))
    );

    let resolved = ReferenceIndirection::new(Arc::clone(&store))
        .materialize(&specific)
        .unwrap()
        .unwrap();
    assert_eq!(resolved.value, CacheValue::Entries(expected));
}

#[test]
fn test_concurrent_first_reads_agree() {
    let (cache, _store, db) = setup();
    let languages = [Some("zh_cn_trad"), Some("zh_cn"), Some("zh"), Some("en"), None];

    thread::scope(|scope| {
        for _ in 0..READERS {
            let cache = Arc::clone(&cache);
            let db = Arc::clone(&db);
            scope.spawn(move || {
                for language in languages {
                    let cached = cache.load_all(language).unwrap();
                    assert!(!cached.is_empty());
                    let title = cache.load_by_key(language, "site.title").unwrap();
                    assert_eq!(title, db.query_by_key(None, "site.title").unwrap());
                }
            });
        }
    });
}
