//! Namespaced cache keys.
//!
//! A cache key is `<base><namespace>[<delim><language>]` where the namespace
//! is the logical key with its external delimiter rewritten to the cache
//! delimiter:
//!
//! ```text
//! user.gender, zh_cn  ->  cacheable:dict:user:gender:zh_cn
//! user.gender, None   ->  cacheable:dict:user:gender
//! all, en             ->  cacheable:dict:all:en
//! ```
//!
//! The aggregate slots use the reserved namespaces `all`, `expand` and
//! `languages`, so those words are rejected as logical keys.

use lexis_core::{DictionaryConfig, ValidationError};

/// Namespace of the "all entries" aggregate slot.
pub const ALL_SLOT: &str = "all";
/// Namespace of the expanded tree aggregate slot.
pub const EXPAND_SLOT: &str = "expand";
/// Namespace of the language catalog slot.
pub const LANGUAGES_SLOT: &str = "languages";

const RESERVED: [&str; 3] = [ALL_SLOT, EXPAND_SLOT, LANGUAGES_SLOT];

/// Reject logical keys the cache cannot address.
pub fn validate_logical_key(key: &str) -> Result<(), ValidationError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyKey);
    }
    if trimmed.len() != key.len() {
        return Err(ValidationError::PaddedKey {
            key: key.to_string(),
        });
    }
    if RESERVED.contains(&key) {
        return Err(ValidationError::ReservedKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

/// What a cache key addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    All,
    Expand,
    Languages,
    /// A single logical key, in external delimiter form.
    Key(String),
}

/// Builds and parses cache keys under one base prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyBuilder {
    base: String,
    key_delimiter: String,
    cache_delimiter: String,
}

impl CacheKeyBuilder {
    pub fn new(
        base: impl Into<String>,
        key_delimiter: impl Into<String>,
        cache_delimiter: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into(),
            key_delimiter: key_delimiter.into(),
            cache_delimiter: cache_delimiter.into(),
        }
    }

    pub fn from_config(config: &DictionaryConfig) -> Self {
        Self::new(
            config.cache_key_prefix.clone(),
            config.key_delimiter.clone(),
            config.cache_delimiter.clone(),
        )
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn key_delimiter(&self) -> &str {
        &self.key_delimiter
    }

    pub fn cache_delimiter(&self) -> &str {
        &self.cache_delimiter
    }

    /// The language-less part of a cache key.
    ///
    /// An empty logical key maps to the base itself, and a key that already
    /// starts with the base is returned unchanged.
    pub fn namespace(&self, logical_key: &str) -> String {
        if logical_key.is_empty() {
            return self.base.clone();
        }
        if logical_key.starts_with(&self.base) {
            return logical_key.to_string();
        }
        let rewritten = logical_key.replace(&self.key_delimiter, &self.cache_delimiter);
        self.join(&self.base, &rewritten)
    }

    /// Full cache key of `logical_key` in `language`.
    pub fn build(&self, logical_key: &str, language: Option<&str>) -> String {
        let namespace = self.namespace(logical_key);
        match language {
            Some(language) if !language.is_empty() => self.join(&namespace, language),
            _ => namespace,
        }
    }

    pub fn all_key(&self, language: Option<&str>) -> String {
        self.build(ALL_SLOT, language)
    }

    pub fn expand_key(&self, language: Option<&str>) -> String {
        self.build(EXPAND_SLOT, language)
    }

    pub fn languages_key(&self) -> String {
        self.build(LANGUAGES_SLOT, None)
    }

    /// Suffix shared by every slot of `language`, e.g. `:zh_cn`.
    ///
    /// The leading delimiter keeps `zh` from matching `zh_cn` slots.
    pub fn language_suffix(&self, language: &str) -> String {
        format!("{}{}", self.cache_delimiter, language)
    }

    /// Recover the logical key from a cache key, stripping the base and the
    /// trailing language segment when given.
    ///
    /// Returns `None` when the key is outside this builder's base or does not
    /// carry the given language.
    pub fn logical_key(&self, cache_key: &str, language: Option<&str>) -> Option<String> {
        let mut rest = cache_key.strip_prefix(&self.base)?;
        if let Some(language) = language.filter(|l| !l.is_empty()) {
            rest = rest.strip_suffix(&self.language_suffix(language))?;
        }
        let rest = rest.strip_prefix(&self.cache_delimiter).unwrap_or(rest);
        if rest.is_empty() {
            return None;
        }
        Some(rest.replace(&self.cache_delimiter, &self.key_delimiter))
    }

    /// Classify a cache key discovered by a suffix scan for `language`.
    pub fn classify(&self, cache_key: &str, language: Option<&str>) -> Option<Slot> {
        let logical = self.logical_key(cache_key, language)?;
        Some(match logical.as_str() {
            ALL_SLOT => Slot::All,
            EXPAND_SLOT => Slot::Expand,
            LANGUAGES_SLOT => Slot::Languages,
            _ => Slot::Key(logical),
        })
    }

    fn join(&self, head: &str, tail: &str) -> String {
        if head.ends_with(&self.cache_delimiter) {
            format!("{}{}", head, tail)
        } else {
            format!("{}{}{}", head, self.cache_delimiter, tail)
        }
    }
}

impl Default for CacheKeyBuilder {
    fn default() -> Self {
        Self::from_config(&DictionaryConfig::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> CacheKeyBuilder {
        CacheKeyBuilder::default()
    }

    #[test]
    fn test_build_rewrites_delimiter_and_appends_language() {
        let keys = builder();
        assert_eq!(
            keys.build("user.gender", Some("zh_cn")),
            "cacheable:dict:user:gender:zh_cn"
        );
        assert_eq!(keys.build("user.gender", None), "cacheable:dict:user:gender");
        assert_eq!(keys.build("user.gender", Some("")), "cacheable:dict:user:gender");
    }

    #[test]
    fn test_empty_logical_key_is_base() {
        let keys = builder();
        assert_eq!(keys.build("", None), "cacheable:dict:");
    }

    #[test]
    fn test_key_with_base_is_unchanged() {
        let keys = builder();
        let full = "cacheable:dict:user:gender";
        assert_eq!(keys.namespace(full), full);
        assert_eq!(keys.build(full, Some("en")), "cacheable:dict:user:gender:en");
    }

    #[test]
    fn test_base_without_trailing_delimiter() {
        let keys = CacheKeyBuilder::new("app", ".", ":");
        assert_eq!(keys.build("a.b", Some("fr")), "app:a:b:fr");
        assert_eq!(keys.logical_key("app:a:b:fr", Some("fr")), Some("a.b".to_string()));
    }

    #[test]
    fn test_slot_keys() {
        let keys = builder();
        assert_eq!(keys.all_key(None), "cacheable:dict:all");
        assert_eq!(keys.all_key(Some("en")), "cacheable:dict:all:en");
        assert_eq!(keys.expand_key(Some("zh")), "cacheable:dict:expand:zh");
        assert_eq!(keys.languages_key(), "cacheable:dict:languages");
    }

    #[test]
    fn test_language_suffix_does_not_match_longer_tag() {
        let keys = builder();
        let suffix = keys.language_suffix("zh");
        assert!(keys.build("user.gender", Some("zh")).ends_with(&suffix));
        assert!(!keys.build("user.gender", Some("zh_cn")).ends_with(&suffix));
    }

    #[test]
    fn test_logical_key_inverse() {
        let keys = builder();
        assert_eq!(
            keys.logical_key("cacheable:dict:user:gender:zh_cn", Some("zh_cn")),
            Some("user.gender".to_string())
        );
        assert_eq!(
            keys.logical_key("cacheable:dict:user:gender", None),
            Some("user.gender".to_string())
        );
        assert_eq!(keys.logical_key("other:user:gender", None), None);
        assert_eq!(keys.logical_key("cacheable:dict:user:gender:en", Some("fr")), None);
        assert_eq!(keys.logical_key("cacheable:dict:", None), None);
    }

    #[test]
    fn test_classify() {
        let keys = builder();
        assert_eq!(keys.classify("cacheable:dict:all:en", Some("en")), Some(Slot::All));
        assert_eq!(keys.classify("cacheable:dict:expand:en", Some("en")), Some(Slot::Expand));
        assert_eq!(keys.classify("cacheable:dict:languages", None), Some(Slot::Languages));
        assert_eq!(
            keys.classify("cacheable:dict:site:title:en", Some("en")),
            Some(Slot::Key("site.title".to_string()))
        );
    }

    #[test]
    fn test_validate_logical_key() {
        assert_eq!(validate_logical_key(""), Err(ValidationError::EmptyKey));
        assert_eq!(validate_logical_key("  "), Err(ValidationError::EmptyKey));
        assert!(matches!(
            validate_logical_key("all"),
            Err(ValidationError::ReservedKey { .. })
        ));
        assert_eq!(
            validate_logical_key(" site.title"),
            Err(ValidationError::PaddedKey {
                key: " site.title".to_string()
            })
        );
        assert!(validate_logical_key("site.title\n").is_err());
        assert!(validate_logical_key("all.users").is_ok());
        assert!(validate_logical_key("user.gender").is_ok());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_logical_key() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,8}(\\.[a-z][a-z0-9_]{0,8}){0,3}"
    }

    proptest! {
        /// logical_key inverts build for every language.
        #[test]
        fn prop_logical_key_inverts_build(
            key in arb_logical_key(),
            language in proptest::option::of("[a-z]{2}(_[a-z]{2})?"),
        ) {
            let keys = CacheKeyBuilder::default();
            let cache_key = keys.build(&key, language.as_deref());
            prop_assert_eq!(keys.logical_key(&cache_key, language.as_deref()), Some(key));
        }

        /// Building from an already namespaced key is idempotent.
        #[test]
        fn prop_namespace_idempotent(key in arb_logical_key()) {
            let keys = CacheKeyBuilder::default();
            let once = keys.namespace(&key);
            prop_assert_eq!(keys.namespace(&once), once.clone());
            prop_assert!(once.starts_with(keys.base()));
        }

        /// Every slot of a language ends with its suffix.
        #[test]
        fn prop_slots_end_with_language_suffix(
            key in arb_logical_key(),
            language in "[a-z]{2}(_[a-z]{2})?",
        ) {
            let keys = CacheKeyBuilder::default();
            let suffix = keys.language_suffix(&language);
            prop_assert!(keys.build(&key, Some(&language)).ends_with(&suffix));
            prop_assert!(keys.all_key(Some(&language)).ends_with(&suffix));
            prop_assert!(keys.expand_key(Some(&language)).ends_with(&suffix));
        }
    }
}
