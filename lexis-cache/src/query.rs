//! Read-side persistence collaborator.

use lexis_core::{BackendError, DictionaryEntry, EntryId, LanguageEntry, LexisError, LexisResult};
use thiserror::Error;

/// Failures a [`QueryProvider`] can report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The per-language table has not been provisioned yet. Treated as an
    /// empty result by the cache.
    #[error("Dictionary table for language {language:?} does not exist")]
    TableMissing { language: Option<String> },

    #[error("Query failed: {0}")]
    Failed(String),
}

impl From<QueryError> for LexisError {
    fn from(e: QueryError) -> Self {
        LexisError::Backend(BackendError::Query {
            reason: e.to_string(),
        })
    }
}

/// Reads dictionary rows and the language catalog from persistent storage.
///
/// `language` is a normalized tag or `None` for the default language. No
/// matching rows is an empty `Vec`, never an error.
pub trait QueryProvider: Send + Sync {
    fn query_all(&self, language: Option<&str>) -> Result<Vec<DictionaryEntry>, QueryError>;

    fn query_by_key(
        &self,
        language: Option<&str>,
        key: &str,
    ) -> Result<Vec<DictionaryEntry>, QueryError>;

    fn query_by_ids(
        &self,
        language: Option<&str>,
        ids: &[EntryId],
    ) -> Result<Vec<DictionaryEntry>, QueryError>;

    fn query_languages(&self) -> Result<Vec<LanguageEntry>, QueryError>;
}

/// Map a missing table to an empty result; every other failure propagates.
pub(crate) fn recover_missing_table<T: Default>(
    result: Result<T, QueryError>,
    operation: &'static str,
) -> LexisResult<T> {
    match result {
        Ok(rows) => Ok(rows),
        Err(QueryError::TableMissing { language }) => {
            tracing::warn!(
                operation = operation,
                language = ?language,
                "Dictionary table missing, treating as empty"
            );
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}
