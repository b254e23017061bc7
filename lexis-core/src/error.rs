//! Error types for Lexis operations

use thiserror::Error;

/// Precondition failures detected at a public boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Dictionary key cannot be empty")]
    EmptyKey,

    #[error("Dictionary key '{key}' collides with a reserved cache slot name")]
    ReservedKey { key: String },

    #[error("Dictionary key '{key}' has leading or trailing whitespace")]
    PaddedKey { key: String },

    #[error("Invalid language tag '{value}': {reason}")]
    InvalidLanguage { value: String, reason: String },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Source and target language are both '{language}'")]
    SameLanguage { language: String },
}

/// Language catalog and entry lookup failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Language not found: {language}")]
    LanguageNotFound { language: String },

    #[error("Language already exists: {language}")]
    LanguageAlreadyExists { language: String },

    #[error("Dictionary entry not found: id {id}")]
    EntryNotFound { id: i64 },
}

/// Failures of a cache store or of the query provider underneath the cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Cache store '{backend}' failed: {reason}")]
    Store { backend: String, reason: String },

    #[error("Query provider failed: {reason}")]
    Query { reason: String },

    #[error("Reference chain starting at '{key}' exceeded {depth} hops")]
    ReferenceCycle { key: String, depth: usize },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Lexis errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LexisError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl LexisError {
    /// True for store and query-provider failures.
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// True for precondition failures raised before touching any backend.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for Lexis operations.
pub type LexisResult<T> = Result<T, LexisError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_reserved_key() {
        let err = ValidationError::ReservedKey {
            key: "all".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("'all'"));
        assert!(msg.contains("reserved"));
    }

    #[test]
    fn test_backend_error_display_reference_cycle() {
        let err = BackendError::ReferenceCycle {
            key: "cacheable:dict:user:gender:zh_cn".to_string(),
            depth: 8,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("user:gender:zh_cn"));
        assert!(msg.contains("8 hops"));
    }

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::LanguageAlreadyExists {
            language: "zh-CN".to_string(),
        };
        assert_eq!(format!("{}", err), "Language already exists: zh-CN");
    }

    #[test]
    fn test_lexis_error_from_conversions() {
        let validation = LexisError::from(ValidationError::EmptyKey);
        assert!(validation.is_invalid_argument());
        assert!(!validation.is_backend());

        let backend = LexisError::from(BackendError::Query {
            reason: "connection reset".to_string(),
        });
        assert!(backend.is_backend());

        let catalog = LexisError::from(CatalogError::EntryNotFound { id: 7 });
        assert!(matches!(catalog, LexisError::Catalog(_)));

        let config = LexisError::from(ConfigError::MissingRequired {
            field: "redis_url".to_string(),
        });
        assert!(matches!(config, LexisError::Config(_)));
    }
}
