//! Dictionary management facade.
//!
//! [`DictionaryManager`] is the surface applications use: filtered reads on
//! top of [`DictionaryCache`], and writes through a [`DictionaryRepository`]
//! followed by the reload protocol.
//!
//! # Reload protocol
//!
//! After a write to language `L` reports affected rows, the touched key
//! slots are reloaded, then the all-entries aggregate, then the expanded
//! tree. The same happens for every catalog language more specific than `L`
//! (`zh_cn` for `zh`, every language for the default), since their slots may
//! be references into `L`'s answers.

use std::sync::Arc;

use chrono::Utc;
use lexis_core::language::SUBTAG_SEPARATOR;
use lexis_core::{
    normalize_language, normalize_optional, CatalogError, DictionaryConfig, DictionaryEntry,
    DisplayNames, EntryId, IdGenerator, LanguageEntry, LexisResult, SnowflakeIdGenerator,
    StaticDisplayNames, ValidationError,
};

use crate::cache::{validate_logical_key, CacheStore, DictionaryTree};
use crate::dictionary_cache::DictionaryCache;
use crate::query::{recover_missing_table, QueryProvider};
use crate::repository::DictionaryRepository;

/// Reads and writes dictionary data with cache maintenance.
pub struct DictionaryManager<S, Q, R>
where
    S: CacheStore + ?Sized,
    Q: QueryProvider + ?Sized,
    R: DictionaryRepository + ?Sized,
{
    cache: DictionaryCache<S, Q>,
    repository: Arc<R>,
    ids: Arc<dyn IdGenerator>,
    display_names: Arc<dyn DisplayNames>,
    small_batch_size: usize,
    big_batch_size: usize,
}

impl<S, Q, R> DictionaryManager<S, Q, R>
where
    S: CacheStore + ?Sized,
    Q: QueryProvider + ?Sized,
    R: DictionaryRepository + ?Sized,
{
    /// Build a manager and, if `preload_default` is set, warm the
    /// default-language aggregate. A failed warm-up is logged only.
    pub fn new(
        store: Arc<S>,
        query: Arc<Q>,
        repository: Arc<R>,
        config: &DictionaryConfig,
    ) -> LexisResult<Self> {
        config.validate()?;
        let manager = Self {
            cache: DictionaryCache::new(store, query, config),
            repository,
            ids: Arc::new(SnowflakeIdGenerator::default()),
            display_names: Arc::new(StaticDisplayNames::new()),
            small_batch_size: config.small_batch_size.max(1),
            big_batch_size: config.big_batch_size.max(1),
        };

        if config.preload_default {
            match manager.cache.load_all(None) {
                Ok(entries) => {
                    tracing::info!(count = entries.len(), "Preloaded default dictionary")
                }
                Err(e) => tracing::warn!(error = %e, "Dictionary preload failed"),
            }
        }
        Ok(manager)
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_display_names(mut self, display_names: Arc<dyn DisplayNames>) -> Self {
        self.display_names = display_names;
        self
    }

    pub fn cache(&self) -> &DictionaryCache<S, Q> {
        &self.cache
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// The language catalog, labelled for a reader of `display_locale`.
    pub fn languages(&self, display_locale: Option<&str>) -> LexisResult<Vec<LanguageEntry>> {
        let locale = normalize_optional(display_locale)?;
        let languages = self.cache.load_languages()?;
        Ok(languages
            .into_iter()
            .map(|language| {
                let label = self.display_names.display_name(&language, locale.as_deref());
                language.with_display_label(label)
            })
            .collect())
    }

    pub fn expand_all(&self, language: Option<&str>) -> LexisResult<DictionaryTree> {
        self.cache.expand_all(language)
    }

    pub fn get_all(&self, language: Option<&str>) -> LexisResult<Vec<DictionaryEntry>> {
        self.get_all_always(language).map(enabled_only)
    }

    pub fn get_all_always(&self, language: Option<&str>) -> LexisResult<Vec<DictionaryEntry>> {
        self.cache.load_all(language)
    }

    pub fn get(&self, language: Option<&str>, key: &str) -> LexisResult<Vec<DictionaryEntry>> {
        self.get_always(language, key).map(enabled_only)
    }

    pub fn get_always(&self, language: Option<&str>, key: &str) -> LexisResult<Vec<DictionaryEntry>> {
        self.cache.load_by_key(language, key)
    }

    /// Entries of several keys, concatenated in the order of `keys`.
    pub fn get_many(&self, language: Option<&str>, keys: &[&str]) -> LexisResult<Vec<DictionaryEntry>> {
        self.get_many_always(language, keys).map(enabled_only)
    }

    pub fn get_many_always(
        &self,
        language: Option<&str>,
        keys: &[&str],
    ) -> LexisResult<Vec<DictionaryEntry>> {
        if keys.is_empty() {
            return Err(ValidationError::MissingField {
                field: "keys".to_string(),
            }
            .into());
        }
        let mut entries = Vec::new();
        for key in keys {
            entries.extend(self.get_always(language, key)?);
        }
        Ok(entries)
    }

    /// First enabled entry of `key` with `code`.
    pub fn match_code(
        &self,
        language: Option<&str>,
        key: &str,
        code: i32,
    ) -> LexisResult<Option<DictionaryEntry>> {
        self.matching(language, key, |e| e.enabled && e.code == Some(code))
    }

    pub fn match_code_always(
        &self,
        language: Option<&str>,
        key: &str,
        code: i32,
    ) -> LexisResult<Option<DictionaryEntry>> {
        self.matching(language, key, |e| e.code == Some(code))
    }

    /// First enabled entry of `key` with `alias`.
    pub fn match_alias(
        &self,
        language: Option<&str>,
        key: &str,
        alias: &str,
    ) -> LexisResult<Option<DictionaryEntry>> {
        self.matching(language, key, |e| e.enabled && e.alias.as_deref() == Some(alias))
    }

    pub fn match_alias_always(
        &self,
        language: Option<&str>,
        key: &str,
        alias: &str,
    ) -> LexisResult<Option<DictionaryEntry>> {
        self.matching(language, key, |e| e.alias.as_deref() == Some(alias))
    }

    /// First entry of `key`, disabled ones included, satisfying `predicate`.
    pub fn matching<P>(
        &self,
        language: Option<&str>,
        key: &str,
        predicate: P,
    ) -> LexisResult<Option<DictionaryEntry>>
    where
        P: Fn(&DictionaryEntry) -> bool,
    {
        Ok(self
            .get_always(language, key)?
            .into_iter()
            .find(|entry| predicate(entry)))
    }

    pub fn exists_language(&self, language: &str) -> LexisResult<bool> {
        let language = required_language(language)?;
        Ok(self
            .cache
            .load_languages()?
            .iter()
            .any(|l| l.same_language(&language)))
    }

    // ========================================================================
    // ENTRY WRITES
    // ========================================================================

    /// Insert one entry. Returns true if a row was written.
    pub fn add(&self, language: Option<&str>, entry: DictionaryEntry) -> LexisResult<bool> {
        let language = normalize_optional(language)?;
        validate_logical_key(&entry.key)?;
        let entry = self.prepare_insert(entry);

        let rows = self
            .repository
            .insert_entries(language.as_deref(), std::slice::from_ref(&entry))?;
        if rows == 0 {
            return Ok(false);
        }
        self.reload_after_write(language.as_deref(), &[entry.key.as_str()])?;
        Ok(true)
    }

    /// Insert several entries. Returns the number of rows written.
    pub fn add_batch(&self, language: Option<&str>, entries: Vec<DictionaryEntry>) -> LexisResult<usize> {
        let language = normalize_optional(language)?;
        if entries.is_empty() {
            return Err(ValidationError::MissingField {
                field: "entries".to_string(),
            }
            .into());
        }
        for entry in &entries {
            validate_logical_key(&entry.key)?;
        }
        let entries: Vec<DictionaryEntry> =
            entries.into_iter().map(|e| self.prepare_insert(e)).collect();

        let rows = self.in_batches(&entries, |chunk| {
            self.repository.insert_entries(language.as_deref(), chunk)
        })?;
        tracing::debug!(language = ?language, rows = rows, "Inserted dictionary batch");
        if rows > 0 {
            self.reload_after_write(language.as_deref(), &distinct_keys(&entries))?;
        }
        Ok(rows)
    }

    /// Update one entry by id. A key moved by the update is reloaded under
    /// both its old and new name.
    pub fn update(&self, language: Option<&str>, mut entry: DictionaryEntry) -> LexisResult<usize> {
        let language = normalize_optional(language)?;
        let id = required_id(&entry)?;
        validate_logical_key(&entry.key)?;

        let original = self
            .originals(language.as_deref(), &[id])?
            .into_iter()
            .next()
            .ok_or(CatalogError::EntryNotFound { id })?;

        entry.touch(Utc::now());
        let rows = self
            .repository
            .update_entries(language.as_deref(), std::slice::from_ref(&entry))?;
        if rows > 0 {
            let mut keys = vec![entry.key.as_str()];
            if original.key != entry.key {
                keys.push(original.key.as_str());
            }
            self.reload_after_write(language.as_deref(), &keys)?;
        }
        Ok(rows)
    }

    /// Update several entries by id.
    pub fn update_batch(&self, language: Option<&str>, entries: Vec<DictionaryEntry>) -> LexisResult<usize> {
        let language = normalize_optional(language)?;
        if entries.is_empty() {
            return Err(ValidationError::MissingField {
                field: "entries".to_string(),
            }
            .into());
        }
        let mut ids = Vec::with_capacity(entries.len());
        for entry in &entries {
            let id = required_id(entry)?;
            validate_logical_key(&entry.key)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        let originals = self.originals(language.as_deref(), &ids)?;
        let now = Utc::now();
        let entries: Vec<DictionaryEntry> = entries
            .into_iter()
            .map(|mut e| {
                e.touch(now);
                e
            })
            .collect();

        let rows = self.in_batches(&entries, |chunk| {
            self.repository.update_entries(language.as_deref(), chunk)
        })?;
        tracing::debug!(language = ?language, rows = rows, "Updated dictionary batch");
        if rows > 0 {
            let mut keys = distinct_keys(&entries);
            for key in distinct_keys(&originals) {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
            self.reload_after_write(language.as_deref(), &keys)?;
        }
        Ok(rows)
    }

    /// Enable or disable every entry of `key`, or only the one with `code`.
    pub fn change_status(
        &self,
        language: Option<&str>,
        key: &str,
        code: Option<i32>,
        enabled: bool,
    ) -> LexisResult<usize> {
        validate_logical_key(key)?;
        let language = normalize_optional(language)?;
        let rows = self
            .repository
            .change_status(language.as_deref(), key, code, enabled)?;
        if rows > 0 {
            self.reload_after_write(language.as_deref(), &[key])?;
        }
        Ok(rows)
    }

    /// [`Self::change_status`] in the default language and every catalog
    /// language.
    pub fn change_status_everywhere(
        &self,
        key: &str,
        code: Option<i32>,
        enabled: bool,
    ) -> LexisResult<usize> {
        validate_logical_key(key)?;
        let mut rows = 0;
        for language in self.every_language()? {
            rows += self.change_status(language.as_deref(), key, code, enabled)?;
        }
        Ok(rows)
    }

    /// Delete every entry of `key`, or only the one with `code`.
    pub fn remove(&self, language: Option<&str>, key: &str, code: Option<i32>) -> LexisResult<usize> {
        validate_logical_key(key)?;
        let language = normalize_optional(language)?;
        let rows = self.repository.remove_entries(language.as_deref(), key, code)?;
        if rows > 0 {
            self.reload_after_write(language.as_deref(), &[key])?;
        }
        Ok(rows)
    }

    /// [`Self::remove`] in the default language and every catalog language.
    pub fn remove_everywhere(&self, key: &str, code: Option<i32>) -> LexisResult<usize> {
        validate_logical_key(key)?;
        let mut rows = 0;
        for language in self.every_language()? {
            rows += self.remove(language.as_deref(), key, code)?;
        }
        Ok(rows)
    }

    // ========================================================================
    // LANGUAGE WRITES
    // ========================================================================

    /// Add a language to the catalog and provision its empty table.
    pub fn add_language(&self, mut language: LanguageEntry) -> LexisResult<bool> {
        let tag = required_language(&language.lang)?;
        let catalog = self.cache.load_languages()?;
        if catalog.iter().any(|l| l.same_language(&tag)) {
            return Err(CatalogError::LanguageAlreadyExists { language: tag }.into());
        }

        if language.order_index.is_none() {
            let max = catalog.iter().filter_map(|l| l.order_index).max();
            language.order_index = Some(max.map_or(1, |m| m + 1));
        }
        if language.id.is_none() {
            language.id = Some(self.ids.next_id());
        }
        if language.create_time.is_none() {
            language.create_time = Some(Utc::now());
        }
        language.lang = tag.clone();
        language.display_label = None;

        if self.repository.insert_language(&language)? == 0 {
            return Ok(false);
        }
        self.repository.provision_language(&tag)?;
        self.cache.reload_languages_if_necessary()?;
        tracing::info!(language = %tag, order_index = ?language.order_index, "Added language");
        Ok(true)
    }

    pub fn update_language(&self, language: &LanguageEntry) -> LexisResult<usize> {
        if language.id.is_none() {
            return Err(ValidationError::MissingField {
                field: "id".to_string(),
            }
            .into());
        }
        let rows = self.repository.update_language(language)?;
        if rows > 0 {
            self.cache.reload_languages_if_necessary()?;
        }
        Ok(rows)
    }

    /// Remove a language, its table and every cached slot it owns.
    pub fn remove_language(&self, language: &str) -> LexisResult<usize> {
        let language = required_language(language)?;
        let rows = self.repository.remove_language(&language)?;
        self.cache.clear_language(&language)?;
        self.cache.reload_languages_if_necessary()?;
        tracing::info!(language = %language, rows = rows, "Removed language");
        Ok(rows)
    }

    /// Copy every row of `source` into the catalog language `target`, then
    /// reload the slots `target` has cached.
    pub fn add_snapshot(&self, source: Option<&str>, target: &str) -> LexisResult<bool> {
        let source = normalize_optional(source)?;
        let target = required_language(target)?;
        if source.as_deref() == Some(target.as_str()) {
            return Err(ValidationError::SameLanguage { language: target }.into());
        }
        if !self.exists_language(&target)? {
            return Err(CatalogError::LanguageNotFound { language: target }.into());
        }

        self.repository.provision_language(&target)?;
        let rows = self.repository.copy_entries(source.as_deref(), &target)?;
        tracing::info!(source = ?source, target = %target, rows = rows, "Copied dictionary snapshot");
        if rows == 0 {
            return Ok(false);
        }
        self.cache.reload_language_slots(&target)?;
        for dependent in self.dependent_languages(Some(&target))? {
            self.cache.reload_language_slots(&dependent)?;
        }
        Ok(true)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn prepare_insert(&self, mut entry: DictionaryEntry) -> DictionaryEntry {
        let id = match entry.id {
            Some(id) => id,
            None => self.ids.next_id(),
        };
        entry.apply_create_defaults(id, Utc::now());
        entry
    }

    fn originals(&self, language: Option<&str>, ids: &[EntryId]) -> LexisResult<Vec<DictionaryEntry>> {
        recover_missing_table(self.cache.query().query_by_ids(language, ids), "query_by_ids")
    }

    /// Up to `small_batch_size` rows go in one call, larger inputs in
    /// `big_batch_size` chunks.
    fn in_batches<F>(&self, entries: &[DictionaryEntry], mut write: F) -> LexisResult<usize>
    where
        F: FnMut(&[DictionaryEntry]) -> LexisResult<usize>,
    {
        if entries.len() <= self.small_batch_size {
            return write(entries);
        }
        let mut rows = 0;
        for chunk in entries.chunks(self.big_batch_size) {
            rows += write(chunk)?;
        }
        Ok(rows)
    }

    fn reload_after_write<K: AsRef<str>>(&self, language: Option<&str>, keys: &[K]) -> LexisResult<()> {
        let mut languages = vec![language.map(str::to_string)];
        languages.extend(self.dependent_languages(language)?.into_iter().map(Some));

        for language in &languages {
            let language = language.as_deref();
            for key in keys {
                self.cache.reload_key_if_necessary(language, key.as_ref())?;
            }
            self.cache.reload_all_if_necessary(language)?;
            self.cache.reload_expand_all_if_necessary(language)?;
        }
        Ok(())
    }

    /// Catalog languages more specific than `language`.
    fn dependent_languages(&self, language: Option<&str>) -> LexisResult<Vec<String>> {
        let mut dependents = Vec::new();
        for entry in self.cache.load_languages()? {
            let tag = entry.language();
            let depends = match language {
                None => true,
                Some(parent) => {
                    tag.len() > parent.len()
                        && tag.starts_with(parent)
                        && tag[parent.len()..].starts_with(SUBTAG_SEPARATOR)
                }
            };
            if depends && !dependents.contains(&tag) {
                dependents.push(tag);
            }
        }
        Ok(dependents)
    }

    /// The default language followed by every catalog language.
    fn every_language(&self) -> LexisResult<Vec<Option<String>>> {
        let mut languages = vec![None];
        languages.extend(self.dependent_languages(None)?.into_iter().map(Some));
        Ok(languages)
    }
}

fn enabled_only(entries: Vec<DictionaryEntry>) -> Vec<DictionaryEntry> {
    entries.into_iter().filter(|e| e.enabled).collect()
}

fn distinct_keys(entries: &[DictionaryEntry]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for entry in entries {
        if !keys.contains(&entry.key) {
            keys.push(entry.key.clone());
        }
    }
    keys
}

fn required_id(entry: &DictionaryEntry) -> Result<EntryId, ValidationError> {
    entry.id.ok_or_else(|| ValidationError::MissingField {
        field: "id".to_string(),
    })
}

fn required_language(language: &str) -> Result<String, ValidationError> {
    normalize_language(language)?.ok_or_else(|| ValidationError::MissingField {
        field: "language".to_string(),
    })
}
