//! In-memory persistence for tests and embedding without a database.
//!
//! Holds one table per language plus the default table, and the language
//! catalog. A language without a table reports
//! [`QueryError::TableMissing`], like an unprovisioned SQL table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use lexis_core::{
    BackendError, CatalogError, DictionaryEntry, EntryId, LanguageEntry, LexisResult,
};

use crate::query::{QueryError, QueryProvider};
use crate::repository::DictionaryRepository;

type Tables = HashMap<Option<String>, Vec<DictionaryEntry>>;

/// In-memory implementation of [`QueryProvider`] and [`DictionaryRepository`].
#[derive(Debug, Clone)]
pub struct InMemoryDictionaryStore {
    tables: Arc<RwLock<Tables>>,
    languages: Arc<RwLock<Vec<LanguageEntry>>>,
    failing: Arc<AtomicBool>,
}

impl Default for InMemoryDictionaryStore {
    fn default() -> Self {
        let mut tables = Tables::new();
        tables.insert(None, Vec::new());
        Self {
            tables: Arc::new(RwLock::new(tables)),
            languages: Arc::new(RwLock::new(Vec::new())),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl InMemoryDictionaryStore {
    /// Create a store with an empty default table and no languages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the table for `language` if it does not exist.
    pub fn provision(&self, language: Option<&str>) {
        self.write_tables()
            .entry(language.map(str::to_string))
            .or_default();
    }

    /// Replace the contents of a table, creating it if needed.
    pub fn seed(&self, language: Option<&str>, entries: Vec<DictionaryEntry>) {
        self.write_tables().insert(language.map(str::to_string), entries);
    }

    /// Replace the language catalog.
    pub fn seed_languages(&self, languages: Vec<LanguageEntry>) {
        *self.write_languages() = languages;
    }

    /// Make every query fail, as if the database were unreachable.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn has_table(&self, language: Option<&str>) -> bool {
        self.read_tables().contains_key(&language.map(str::to_string))
    }

    /// Rows of a table, `None` if it does not exist.
    pub fn entries(&self, language: Option<&str>) -> Option<Vec<DictionaryEntry>> {
        self.read_tables().get(&language.map(str::to_string)).cloned()
    }

    fn read_tables(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_tables(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_languages(&self) -> RwLockReadGuard<'_, Vec<LanguageEntry>> {
        self.languages.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_languages(&self) -> RwLockWriteGuard<'_, Vec<LanguageEntry>> {
        self.languages.write().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), QueryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(QueryError::Failed("dictionary store unavailable".to_string()));
        }
        Ok(())
    }

    /// Filter the rows of one table.
    fn select<F>(&self, language: Option<&str>, predicate: F) -> Result<Vec<DictionaryEntry>, QueryError>
    where
        F: Fn(&DictionaryEntry) -> bool,
    {
        self.check_available()?;
        let tables = self.read_tables();
        let table = tables
            .get(&language.map(str::to_string))
            .ok_or_else(|| QueryError::TableMissing {
                language: language.map(str::to_string),
            })?;
        Ok(table.iter().filter(|e| predicate(e)).cloned().collect())
    }

    /// Run `f` against one table under the write lock.
    fn mutate<T, F>(&self, language: Option<&str>, f: F) -> LexisResult<T>
    where
        F: FnOnce(&mut Vec<DictionaryEntry>) -> LexisResult<T>,
    {
        self.check_available()?;
        let mut tables = self.write_tables();
        let table = tables
            .get_mut(&language.map(str::to_string))
            .ok_or_else(|| QueryError::TableMissing {
                language: language.map(str::to_string),
            })?;
        f(table)
    }
}

impl QueryProvider for InMemoryDictionaryStore {
    fn query_all(&self, language: Option<&str>) -> Result<Vec<DictionaryEntry>, QueryError> {
        self.select(language, |_| true)
    }

    fn query_by_key(
        &self,
        language: Option<&str>,
        key: &str,
    ) -> Result<Vec<DictionaryEntry>, QueryError> {
        self.select(language, |e| e.key == key)
    }

    fn query_by_ids(
        &self,
        language: Option<&str>,
        ids: &[EntryId],
    ) -> Result<Vec<DictionaryEntry>, QueryError> {
        self.select(language, |e| e.id.map_or(false, |id| ids.contains(&id)))
    }

    fn query_languages(&self) -> Result<Vec<LanguageEntry>, QueryError> {
        self.check_available()?;
        let mut languages = self.read_languages().clone();
        languages.sort_by_key(|l| (l.order_index.is_none(), l.order_index));
        Ok(languages)
    }
}

impl DictionaryRepository for InMemoryDictionaryStore {
    fn insert_entries(&self, language: Option<&str>, entries: &[DictionaryEntry]) -> LexisResult<usize> {
        self.mutate(language, |table| {
            for entry in entries {
                if entry.id.is_some() && table.iter().any(|e| e.id == entry.id) {
                    return Err(BackendError::Query {
                        reason: format!("duplicate dictionary id {:?}", entry.id),
                    }
                    .into());
                }
            }
            table.extend(entries.iter().cloned());
            Ok(entries.len())
        })
    }

    fn update_entries(&self, language: Option<&str>, entries: &[DictionaryEntry]) -> LexisResult<usize> {
        self.mutate(language, |table| {
            let mut updated = 0;
            for entry in entries.iter().filter(|e| e.id.is_some()) {
                if let Some(row) = table.iter_mut().find(|row| row.id == entry.id) {
                    let create_time = row.create_time;
                    *row = entry.clone();
                    row.create_time = create_time.or(entry.create_time);
                    updated += 1;
                }
            }
            Ok(updated)
        })
    }

    fn change_status(
        &self,
        language: Option<&str>,
        key: &str,
        code: Option<i32>,
        enabled: bool,
    ) -> LexisResult<usize> {
        self.mutate(language, |table| {
            let mut changed = 0;
            for row in table.iter_mut().filter(|row| row.key == key && row.matches_code(code)) {
                row.enabled = enabled;
                changed += 1;
            }
            Ok(changed)
        })
    }

    fn remove_entries(&self, language: Option<&str>, key: &str, code: Option<i32>) -> LexisResult<usize> {
        self.mutate(language, |table| {
            let before = table.len();
            table.retain(|row| !(row.key == key && row.matches_code(code)));
            Ok(before - table.len())
        })
    }

    fn insert_language(&self, language: &LanguageEntry) -> LexisResult<usize> {
        self.check_available()?;
        let mut languages = self.write_languages();
        if languages.iter().any(|l| l.same_language(&language.lang)) {
            return Err(CatalogError::LanguageAlreadyExists {
                language: language.lang.clone(),
            }
            .into());
        }
        languages.push(language.clone());
        Ok(1)
    }

    fn update_language(&self, language: &LanguageEntry) -> LexisResult<usize> {
        self.check_available()?;
        let mut languages = self.write_languages();
        match languages.iter_mut().find(|l| l.id.is_some() && l.id == language.id) {
            Some(row) => {
                *row = LanguageEntry {
                    create_time: row.create_time.or(language.create_time),
                    display_label: None,
                    ..language.clone()
                };
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn remove_language(&self, language: &str) -> LexisResult<usize> {
        self.check_available()?;
        let removed = {
            let mut languages = self.write_languages();
            let before = languages.len();
            languages.retain(|l| !l.same_language(language));
            before - languages.len()
        };
        if removed > 0 {
            self.write_tables().remove(&Some(language.to_string()));
        }
        Ok(removed)
    }

    fn provision_language(&self, language: &str) -> LexisResult<()> {
        self.check_available()?;
        self.provision(Some(language));
        Ok(())
    }

    fn copy_entries(&self, source: Option<&str>, target: &str) -> LexisResult<usize> {
        let rows = self.select(source, |_| true)?;
        self.mutate(Some(target), |table| {
            for row in &rows {
                match table.iter_mut().find(|t| t.id.is_some() && t.id == row.id) {
                    Some(existing) => *existing = row.clone(),
                    None => table.push(row.clone()),
                }
            }
            Ok(rows.len())
        })
    }
}
