//! Read-through dictionary cache with language fallback.
//!
//! [`DictionaryCache`] composes a [`CacheStore`], the key builder, the
//! fallback resolver, reference slots and the tree expander over a
//! [`QueryProvider`]. It never writes persistent state, only its own slots.
//!
//! # Read path
//!
//! For each fallback candidate the slot is read (following references). A
//! missing slot is loaded from the query provider and stored, empty results
//! included. When the answer came from a broader language than requested,
//! the requested slot is aliased to the slot that answered.
//!
//! Store failures on the read path are logged and treated as a miss.
//!
//! # Reload path
//!
//! `reload_*_if_necessary` delete one slot and, only if something was
//! deleted, recompute it immediately. Store failures here propagate.

use std::sync::Arc;

use lexis_core::{
    normalize_language, normalize_optional, DictionaryConfig, DictionaryEntry, LanguageEntry,
    LexisResult, ValidationError,
};

use crate::cache::{
    validate_logical_key, CacheKeyBuilder, CacheStats, CacheStore, CacheValue, DictionaryTree,
    LanguageFallbackResolver, ReferenceIndirection, Resolved, Slot,
};
use crate::expand::TreeExpander;
use crate::query::{recover_missing_table, QueryProvider};

/// The dictionary cache orchestrator.
pub struct DictionaryCache<S: CacheStore + ?Sized, Q: QueryProvider + ?Sized> {
    store: Arc<S>,
    query: Arc<Q>,
    keys: CacheKeyBuilder,
    resolver: LanguageFallbackResolver,
    references: ReferenceIndirection<S>,
    expander: TreeExpander,
}

impl<S: CacheStore + ?Sized, Q: QueryProvider + ?Sized> DictionaryCache<S, Q> {
    pub fn new(store: Arc<S>, query: Arc<Q>, config: &DictionaryConfig) -> Self {
        Self {
            references: ReferenceIndirection::with_max_depth(
                Arc::clone(&store),
                config.max_reference_depth,
            ),
            keys: CacheKeyBuilder::from_config(config),
            resolver: LanguageFallbackResolver::with_fixed_locale(config.fixed_language()),
            expander: TreeExpander::from_config(config),
            store,
            query,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn query(&self) -> &Arc<Q> {
        &self.query
    }

    pub fn keys(&self) -> &CacheKeyBuilder {
        &self.keys
    }

    pub fn resolver(&self) -> &LanguageFallbackResolver {
        &self.resolver
    }

    pub fn stats(&self) -> LexisResult<CacheStats> {
        self.store.stats()
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// The language catalog, from its single global slot.
    pub fn load_languages(&self) -> LexisResult<Vec<LanguageEntry>> {
        let key = self.keys.languages_key();
        if let Some(CacheValue::Languages(languages)) = self.read_slot(&key) {
            return Ok(languages);
        }

        let languages = recover_missing_table(self.query.query_languages(), "query_languages")?;
        tracing::debug!(key = %key, count = languages.len(), "Loaded language catalog");
        self.write_slot(&key, CacheValue::Languages(languages.clone()));
        Ok(languages)
    }

    /// Every entry of the language, disabled ones included.
    pub fn load_all(&self, language: Option<&str>) -> LexisResult<Vec<DictionaryEntry>> {
        let language = normalize_optional(language)?;
        let resolved = self
            .resolver
            .resolve(language.as_deref(), |_, candidate| self.all_for(candidate))?;
        self.alias_fallback(&resolved, |lang| self.keys.all_key(lang));
        Ok(resolved.value)
    }

    /// Entries of one logical key, disabled ones included.
    pub fn load_by_key(
        &self,
        language: Option<&str>,
        key: &str,
    ) -> LexisResult<Vec<DictionaryEntry>> {
        validate_logical_key(key)?;
        let language = normalize_optional(language)?;
        let resolved = self
            .resolver
            .resolve(language.as_deref(), |_, candidate| self.key_for(candidate, key))?;
        self.alias_fallback(&resolved, |lang| self.keys.build(key, lang));
        Ok(resolved.value)
    }

    /// The expanded tree of enabled entries.
    pub fn expand_all(&self, language: Option<&str>) -> LexisResult<DictionaryTree> {
        let language = normalize_optional(language)?;
        let resolved = self
            .resolver
            .resolve(language.as_deref(), |_, candidate| self.tree_for(candidate))?;
        self.alias_fallback(&resolved, |lang| self.keys.expand_key(lang));
        Ok(resolved.value)
    }

    // ========================================================================
    // RELOADS
    // ========================================================================

    pub fn reload_languages_if_necessary(&self) -> LexisResult<bool> {
        if !self.store.delete(&self.keys.languages_key())? {
            return Ok(false);
        }
        self.load_languages()?;
        Ok(true)
    }

    pub fn reload_key_if_necessary(&self, language: Option<&str>, key: &str) -> LexisResult<bool> {
        validate_logical_key(key)?;
        let language = normalize_optional(language)?;
        if !self.store.delete(&self.keys.build(key, language.as_deref()))? {
            return Ok(false);
        }
        tracing::debug!(key = %key, language = ?language, "Reloading key slot");
        self.load_by_key(language.as_deref(), key)?;
        Ok(true)
    }

    pub fn reload_all_if_necessary(&self, language: Option<&str>) -> LexisResult<bool> {
        let language = normalize_optional(language)?;
        if !self.store.delete(&self.keys.all_key(language.as_deref()))? {
            return Ok(false);
        }
        tracing::debug!(language = ?language, "Reloading all-entries slot");
        self.load_all(language.as_deref())?;
        Ok(true)
    }

    pub fn reload_expand_all_if_necessary(&self, language: Option<&str>) -> LexisResult<bool> {
        let language = normalize_optional(language)?;
        if !self.store.delete(&self.keys.expand_key(language.as_deref()))? {
            return Ok(false);
        }
        tracing::debug!(language = ?language, "Reloading expanded tree slot");
        self.expand_all(language.as_deref())?;
        Ok(true)
    }

    /// Remove every slot of `language`. Slots of longer tags sharing its
    /// prefix (`zh_cn` for `zh`) are untouched.
    pub fn clear_language(&self, language: &str) -> LexisResult<u64> {
        let language = required_language(language)?;
        let removed = self
            .store
            .delete_by_suffix(&self.keys.language_suffix(&language))?;
        tracing::info!(language = %language, removed = removed, "Cleared language slots");
        Ok(removed)
    }

    /// Reload every cached slot of `language`: key slots first, then the
    /// all-entries aggregate, then the tree. Returns how many were reloaded.
    pub fn reload_language_slots(&self, language: &str) -> LexisResult<usize> {
        let language = required_language(language)?;
        let suffix = self.keys.language_suffix(&language);

        let mut reload_all = false;
        let mut reload_expand = false;
        let mut reloaded = 0;
        for cache_key in self.store.keys_with_suffix(&suffix)? {
            match self.keys.classify(&cache_key, Some(&language)) {
                Some(Slot::Key(key)) => {
                    if validate_logical_key(&key).is_ok()
                        && self.reload_key_if_necessary(Some(&language), &key)?
                    {
                        reloaded += 1;
                    }
                }
                Some(Slot::All) => reload_all = true,
                Some(Slot::Expand) => reload_expand = true,
                Some(Slot::Languages) | None => {}
            }
        }
        if reload_all && self.reload_all_if_necessary(Some(&language))? {
            reloaded += 1;
        }
        if reload_expand && self.reload_expand_all_if_necessary(Some(&language))? {
            reloaded += 1;
        }

        tracing::info!(language = %language, reloaded = reloaded, "Reloaded language slots");
        Ok(reloaded)
    }

    // ========================================================================
    // CANDIDATE LOADERS
    // ========================================================================

    fn all_for(&self, language: Option<&str>) -> LexisResult<Vec<DictionaryEntry>> {
        let key = self.keys.all_key(language);
        if let Some(CacheValue::Entries(entries)) = self.read_slot(&key) {
            return Ok(entries);
        }

        let entries = recover_missing_table(self.query.query_all(language), "query_all")?;
        tracing::debug!(key = %key, count = entries.len(), "Loaded all entries");
        self.write_slot(&key, CacheValue::Entries(entries.clone()));
        Ok(entries)
    }

    fn key_for(&self, language: Option<&str>, key: &str) -> LexisResult<Vec<DictionaryEntry>> {
        let cache_key = self.keys.build(key, language);
        if let Some(CacheValue::Entries(entries)) = self.read_slot(&cache_key) {
            return Ok(entries);
        }

        let entries =
            recover_missing_table(self.query.query_by_key(language, key), "query_by_key")?;
        tracing::debug!(key = %cache_key, count = entries.len(), "Loaded key entries");
        self.write_slot(&cache_key, CacheValue::Entries(entries.clone()));
        self.patch_aggregates(language, &entries);
        Ok(entries)
    }

    fn tree_for(&self, language: Option<&str>) -> LexisResult<DictionaryTree> {
        let key = self.keys.expand_key(language);
        if let Some(CacheValue::Tree(tree)) = self.read_slot(&key) {
            return Ok(tree);
        }
        // Entries borrowed from a broader language: its tree answers and
        // this slot gets aliased to it.
        if let Ok(Some(CacheValue::Reference(_))) = self.store.get(&self.keys.all_key(language)) {
            return Ok(DictionaryTree::new());
        }

        let tree = self.expander.expand(&self.all_for(language)?);
        tracing::debug!(key = %key, roots = tree.len(), "Expanded dictionary tree");
        self.write_slot(&key, CacheValue::Tree(tree.clone()));
        Ok(tree)
    }

    /// Replace entries of a cached all-entries aggregate whose content
    /// changed, and rebuild the cached tree from it.
    ///
    /// Only an aggregate materialized directly in the language's own slot is
    /// patched; entries it does not already hold are left to the next reload.
    fn patch_aggregates(&self, language: Option<&str>, fresh: &[DictionaryEntry]) {
        if fresh.is_empty() {
            return;
        }
        let all_key = self.keys.all_key(language);
        let mut aggregate = match self.store.get(&all_key) {
            Ok(Some(CacheValue::Entries(entries))) => entries,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(key = %all_key, error = %e, "Cache read failed, skipping aggregate patch");
                return;
            }
        };

        let mut patched = 0;
        for entry in fresh {
            let Some(id) = entry.id else { continue };
            if let Some(existing) = aggregate.iter_mut().find(|e| e.id == Some(id)) {
                if existing.content_token() != entry.content_token() {
                    *existing = entry.clone();
                    patched += 1;
                }
            }
        }
        if patched == 0 {
            return;
        }

        tracing::debug!(key = %all_key, patched = patched, "Patched all-entries aggregate");
        let expand_key = self.keys.expand_key(language);
        if let Ok(Some(CacheValue::Tree(_))) = self.store.get(&expand_key) {
            self.write_slot(&expand_key, CacheValue::Tree(self.expander.expand(&aggregate)));
        }
        self.write_slot(&all_key, CacheValue::Entries(aggregate));
    }

    // ========================================================================
    // SLOT ACCESS
    // ========================================================================

    fn read_slot(&self, key: &str) -> Option<CacheValue> {
        match self.references.materialize(key) {
            Ok(Some(found)) => {
                tracing::trace!(key = %key, target = %found.key, hops = found.hops, "Cache hit");
                Some(found.value)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    fn write_slot(&self, key: &str, value: CacheValue) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
    }

    fn alias_fallback<T, F>(&self, resolved: &Resolved<T>, slot_key: F)
    where
        F: Fn(Option<&str>) -> String,
    {
        if !resolved.fell_back() {
            return;
        }
        let specific = slot_key(resolved.requested.as_deref());
        let target = slot_key(resolved.resolved.as_deref());
        if let Err(e) = self.references.alias(&specific, &target) {
            tracing::warn!(key = %specific, target = %target, error = %e, "Cache alias failed");
        }
    }
}

fn required_language(language: &str) -> Result<String, ValidationError> {
    normalize_language(language)?.ok_or_else(|| ValidationError::MissingField {
        field: "language".to_string(),
    })
}
