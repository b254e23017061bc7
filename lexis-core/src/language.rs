//! Language tag normalization and display names.
//!
//! Language tags arrive in BCP-47 form (`zh-CN`, `en-us`) or already in the
//! internal form (`zh_cn`). Internally every tag is lowercase with `_`
//! separating subtags, which is also the form that appears as the trailing
//! segment of a cache key.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{LanguageEntry, ValidationError};

/// Separator between subtags of a normalized language tag.
pub const SUBTAG_SEPARATOR: char = '_';

/// Tags that would collide with the cache's aggregate slot names when used as
/// a trailing key segment.
pub const RESERVED_TAGS: [&str; 2] = ["all", "expand"];

static NORMALIZED_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]{2,8}(_[a-z0-9]{1,8})*$").expect("language tag pattern is valid")
});

/// Normalize a caller-supplied language tag.
///
/// Returns `Ok(None)` for an empty or blank input, which means "default
/// language". `zh-CN`, `zh_CN` and ` zh-cn ` all normalize to `zh_cn`.
pub fn normalize_language(value: &str) -> Result<Option<String>, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let normalized = trimmed.to_lowercase().replace('-', "_");
    if !NORMALIZED_TAG.is_match(&normalized) {
        return Err(ValidationError::InvalidLanguage {
            value: value.to_string(),
            reason: "expected subtags of letters and digits separated by '-' or '_'".to_string(),
        });
    }
    if RESERVED_TAGS.contains(&normalized.as_str()) {
        return Err(ValidationError::InvalidLanguage {
            value: value.to_string(),
            reason: "reserved cache slot name".to_string(),
        });
    }
    Ok(Some(normalized))
}

/// Normalize an optional language, treating `None` and blank alike.
pub fn normalize_optional(value: Option<&str>) -> Result<Option<String>, ValidationError> {
    match value {
        Some(v) => normalize_language(v),
        None => Ok(None),
    }
}

/// The next broader tag: `zh_cn_trad` -> `zh_cn` -> `zh` -> `None`.
pub fn parent_language(tag: &str) -> Option<&str> {
    tag.rfind(SUBTAG_SEPARATOR).map(|index| &tag[..index])
}

/// Resolves the label shown for a catalog language to a reader of another
/// language.
pub trait DisplayNames: Send + Sync {
    /// Name of `language` as displayed to a reader of `requesting`.
    fn display_name(&self, language: &LanguageEntry, requesting: Option<&str>) -> String;
}

/// Display names backed by an explicit table, falling back to the catalog
/// label of the language itself.
#[derive(Debug, Clone, Default)]
pub struct StaticDisplayNames {
    names: HashMap<(String, String), String>,
}

impl StaticDisplayNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the name of `language` as written in `requesting`.
    pub fn with_name(
        mut self,
        language: &str,
        requesting: &str,
        name: impl Into<String>,
    ) -> Self {
        if let (Ok(Some(language)), Ok(Some(requesting))) =
            (normalize_language(language), normalize_language(requesting))
        {
            self.names.insert((language, requesting), name.into());
        }
        self
    }
}

impl DisplayNames for StaticDisplayNames {
    fn display_name(&self, language: &LanguageEntry, requesting: Option<&str>) -> String {
        let own = language.language();
        let lookup = |requesting: &str| {
            let mut candidate = Some(requesting);
            while let Some(tag) = candidate {
                if let Some(name) = self.names.get(&(own.clone(), tag.to_string())) {
                    return Some(name.clone());
                }
                candidate = parent_language(tag);
            }
            None
        };
        requesting
            .and_then(lookup)
            .unwrap_or_else(|| language.label.clone())
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Normalization is idempotent for any tag it accepts.
        #[test]
        fn prop_normalize_idempotent(
            tag in "[a-zA-Z]{2,4}([-_][a-zA-Z0-9]{1,4}){0,3}".prop_filter("slot name", |t| {
                !RESERVED_TAGS.contains(&t.to_lowercase().as_str())
            })
        ) {
            let once = normalize_language(&tag).unwrap().unwrap();
            let twice = normalize_language(&once).unwrap().unwrap();
            prop_assert_eq!(once, twice);
        }

        /// Walking parents always terminates at the primary subtag.
        #[test]
        fn prop_parent_chain_terminates(tag in "[a-z]{2,3}(_[a-z0-9]{1,4}){0,4}") {
            let mut current = tag.as_str();
            let mut steps = 0;
            while let Some(parent) = parent_language(current) {
                prop_assert!(parent.len() < current.len());
                current = parent;
                steps += 1;
            }
            prop_assert!(!current.contains(SUBTAG_SEPARATOR));
            prop_assert_eq!(steps, tag.matches(SUBTAG_SEPARATOR).count());
        }
    }
}
