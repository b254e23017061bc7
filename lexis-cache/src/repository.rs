//! Write-side persistence collaborator.
//!
//! The cache never calls these; [`crate::DictionaryManager`] does, and runs
//! the reload protocol once a call reports affected rows. Writes must be
//! visible to the [`crate::QueryProvider`] before the call returns.

use lexis_core::{DictionaryEntry, LanguageEntry, LexisResult};

/// Mutates dictionary rows and the language catalog.
///
/// `language` is a normalized tag or `None` for the default language. Every
/// method returns the number of affected rows.
pub trait DictionaryRepository: Send + Sync {
    fn insert_entries(&self, language: Option<&str>, entries: &[DictionaryEntry]) -> LexisResult<usize>;

    /// Replace rows by id. Rows without an id are ignored.
    fn update_entries(&self, language: Option<&str>, entries: &[DictionaryEntry]) -> LexisResult<usize>;

    /// Set `enabled` on every row of `key`, or only the row with `code`.
    fn change_status(
        &self,
        language: Option<&str>,
        key: &str,
        code: Option<i32>,
        enabled: bool,
    ) -> LexisResult<usize>;

    /// Delete every row of `key`, or only the row with `code`.
    fn remove_entries(&self, language: Option<&str>, key: &str, code: Option<i32>) -> LexisResult<usize>;

    fn insert_language(&self, language: &LanguageEntry) -> LexisResult<usize>;

    /// Update a catalog row by id.
    fn update_language(&self, language: &LanguageEntry) -> LexisResult<usize>;

    /// Delete the catalog row and drop the language's table.
    fn remove_language(&self, language: &str) -> LexisResult<usize>;

    /// Create the language's table, shaped like the default one, if missing.
    fn provision_language(&self, language: &str) -> LexisResult<()>;

    /// Copy every row of `source` into `target`, replacing rows with the
    /// same id.
    fn copy_entries(&self, source: Option<&str>, target: &str) -> LexisResult<usize>;
}
