//! Configuration types

use serde::{Deserialize, Serialize};

use crate::language::normalize_language;
use crate::{ConfigError, LexisResult};

/// Default base prefix of every cache key.
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "cacheable:dict:";
/// Default delimiter inside persisted dictionary keys.
pub const DEFAULT_KEY_DELIMITER: &str = ".";
/// Default delimiter inside cache keys.
pub const DEFAULT_CACHE_DELIMITER: &str = ":";
pub const DEFAULT_SMALL_BATCH_SIZE: usize = 500;
pub const DEFAULT_BIG_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MAX_REFERENCE_DEPTH: usize = 8;
pub const DEFAULT_LMDB_MAX_SIZE_MB: usize = 64;

/// Which `CacheStore` implementation backs the dictionary cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local concurrent map.
    #[default]
    Memory,
    /// Remote key/value service shared across instances.
    Redis,
    /// Memory-mapped LMDB environment on local disk.
    Lmdb,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            "lmdb" => Ok(Self::Lmdb),
            other => Err(ConfigError::InvalidValue {
                field: "backend".to_string(),
                value: other.to_string(),
                reason: "expected one of memory, redis, lmdb".to_string(),
            }),
        }
    }
}

/// Dictionary cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Base prefix of every cache key.
    pub cache_key_prefix: String,
    /// Delimiter inside persisted dictionary keys (`user.gender`).
    pub key_delimiter: String,
    /// Delimiter inside cache keys (`cacheable:dict:user:gender`).
    pub cache_delimiter: String,
    /// When set, every lookup uses this locale and no fallback chain runs.
    pub fixed_locale: Option<String>,

    pub backend: StoreBackend,
    pub redis_url: String,
    pub lmdb_path: String,
    pub lmdb_max_size_mb: usize,

    /// Load the default-language aggregate when the manager is built.
    pub preload_default: bool,

    // Write path batching
    pub small_batch_size: usize,
    pub big_batch_size: usize,

    /// Fields kept when an ENUM entry is projected into the expanded tree.
    /// Empty keeps the whole entry.
    pub expand_fields: Vec<String>,

    /// Maximum hops followed when resolving a reference slot.
    pub max_reference_depth: usize,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            cache_key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            key_delimiter: DEFAULT_KEY_DELIMITER.to_string(),
            cache_delimiter: DEFAULT_CACHE_DELIMITER.to_string(),
            fixed_locale: None,
            backend: StoreBackend::Memory,
            redis_url: "redis://127.0.0.1/".to_string(),
            lmdb_path: "./lexis-cache".to_string(),
            lmdb_max_size_mb: DEFAULT_LMDB_MAX_SIZE_MB,
            preload_default: true,
            small_batch_size: DEFAULT_SMALL_BATCH_SIZE,
            big_batch_size: DEFAULT_BIG_BATCH_SIZE,
            expand_fields: Vec::new(),
            max_reference_depth: DEFAULT_MAX_REFERENCE_DEPTH,
        }
    }
}

impl DictionaryConfig {
    /// Create DictionaryConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `LEXIS_CACHE_KEY_PREFIX`: base of every cache key (default: `cacheable:dict:`)
    /// - `LEXIS_KEY_DELIMITER`: delimiter in dictionary keys (default: `.`)
    /// - `LEXIS_CACHE_DELIMITER`: delimiter in cache keys (default: `:`)
    /// - `LEXIS_FIXED_LOCALE`: locale used for every lookup (default: unset)
    /// - `LEXIS_BACKEND`: `memory`, `redis` or `lmdb` (default: `memory`)
    /// - `LEXIS_REDIS_URL`: remote store endpoint
    /// - `LEXIS_LMDB_PATH` / `LEXIS_LMDB_MAX_SIZE_MB`: local persistent store
    /// - `LEXIS_PRELOAD_DEFAULT`: warm the default aggregate (default: true)
    /// - `LEXIS_SMALL_BATCH_SIZE` / `LEXIS_BIG_BATCH_SIZE`: write batching
    /// - `LEXIS_EXPAND_FIELDS`: comma separated ENUM projection fields
    /// - `LEXIS_MAX_REFERENCE_DEPTH`: reference traversal cap (default: 8)
    pub fn from_env() -> LexisResult<Self> {
        let defaults = Self::default();

        let backend = match std::env::var("LEXIS_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.backend,
        };

        let config = Self {
            cache_key_prefix: env_string("LEXIS_CACHE_KEY_PREFIX", defaults.cache_key_prefix),
            key_delimiter: env_string("LEXIS_KEY_DELIMITER", defaults.key_delimiter),
            cache_delimiter: env_string("LEXIS_CACHE_DELIMITER", defaults.cache_delimiter),
            fixed_locale: std::env::var("LEXIS_FIXED_LOCALE")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            backend,
            redis_url: env_string("LEXIS_REDIS_URL", defaults.redis_url),
            lmdb_path: env_string("LEXIS_LMDB_PATH", defaults.lmdb_path),
            lmdb_max_size_mb: env_parse("LEXIS_LMDB_MAX_SIZE_MB", defaults.lmdb_max_size_mb),
            preload_default: std::env::var("LEXIS_PRELOAD_DEFAULT")
                .ok()
                .map(|s| s.to_lowercase() != "false")
                .unwrap_or(defaults.preload_default),
            small_batch_size: env_parse("LEXIS_SMALL_BATCH_SIZE", defaults.small_batch_size),
            big_batch_size: env_parse("LEXIS_BIG_BATCH_SIZE", defaults.big_batch_size),
            expand_fields: std::env::var("LEXIS_EXPAND_FIELDS")
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.expand_fields),
            max_reference_depth: env_parse(
                "LEXIS_MAX_REFERENCE_DEPTH",
                defaults.max_reference_depth,
            ),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; absent fields take their defaults.
    pub fn from_toml_str(source: &str) -> LexisResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::InvalidValue {
            field: "<document>".to_string(),
            value: String::new(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - prefix and both delimiters are non-empty
    /// - the two delimiters differ
    /// - batch sizes and reference depth are positive
    /// - a fixed locale, when given, is a valid language tag
    pub fn validate(&self) -> LexisResult<()> {
        for (field, value) in [
            ("cache_key_prefix", &self.cache_key_prefix),
            ("key_delimiter", &self.key_delimiter),
            ("cache_delimiter", &self.cache_delimiter),
        ] {
            if value.is_empty() {
                return Err(ConfigError::MissingRequired {
                    field: field.to_string(),
                }
                .into());
            }
        }

        if self.key_delimiter == self.cache_delimiter {
            return Err(ConfigError::InvalidValue {
                field: "cache_delimiter".to_string(),
                value: self.cache_delimiter.clone(),
                reason: "cache_delimiter must differ from key_delimiter".to_string(),
            }
            .into());
        }

        for (field, value) in [
            ("small_batch_size", self.small_batch_size),
            ("big_batch_size", self.big_batch_size),
            ("max_reference_depth", self.max_reference_depth),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: format!("{} must be greater than 0", field),
                }
                .into());
            }
        }

        if let Some(locale) = &self.fixed_locale {
            normalize_language(locale).map_err(|e| ConfigError::InvalidValue {
                field: "fixed_locale".to_string(),
                value: locale.clone(),
                reason: e.to_string(),
            })?;
        }

        if self.backend == StoreBackend::Redis && self.redis_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "redis_url".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// The fixed locale in normalized form, if one is configured.
    pub fn fixed_language(&self) -> Option<String> {
        self.fixed_locale
            .as_deref()
            .and_then(|locale| normalize_language(locale).ok().flatten())
    }
}

fn env_string(name: &str, default: String) -> String {
    std::env::var(name).ok().filter(|s| !s.is_empty()).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
