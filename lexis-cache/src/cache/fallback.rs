//! Hierarchical language fallback.
//!
//! A request for `zh_cn_trad` probes `zh_cn_trad`, `zh_cn`, `zh` and finally
//! the default language, stopping at the first candidate whose loader result
//! is non-empty.

use lexis_core::{parent_language, DictionaryEntry, LanguageEntry, LexisResult};

use super::traits::DictionaryTree;

/// Results the resolver can test for emptiness.
pub trait FallbackResult {
    fn is_empty_result(&self) -> bool;
}

impl FallbackResult for Vec<DictionaryEntry> {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

impl FallbackResult for Vec<LanguageEntry> {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

impl FallbackResult for DictionaryTree {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    /// The language originally asked for, `None` for the default.
    pub requested: Option<String>,
    /// The candidate that produced `value`, `None` for the default.
    pub resolved: Option<String>,
}

impl<T> Resolved<T> {
    /// True when the answer came from a broader language than requested.
    pub fn fell_back(&self) -> bool {
        self.requested != self.resolved
    }
}

/// Produces the ordered candidate chain and drives a loader across it.
#[derive(Debug, Clone, Default)]
pub struct LanguageFallbackResolver {
    fixed_locale: Option<String>,
}

impl LanguageFallbackResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver that ignores the requested language and always uses
    /// `locale`, without any chain.
    pub fn with_fixed_locale(locale: Option<String>) -> Self {
        Self {
            fixed_locale: locale,
        }
    }

    pub fn fixed_locale(&self) -> Option<&str> {
        self.fixed_locale.as_deref()
    }

    /// The language a request is effectively made in.
    pub fn effective_language<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        match self.fixed_locale.as_deref() {
            Some(fixed) => Some(fixed),
            None => requested.filter(|l| !l.is_empty()),
        }
    }

    /// Candidates from most specific to the default (`None`).
    pub fn candidates(&self, requested: Option<&str>) -> Vec<Option<String>> {
        if let Some(fixed) = &self.fixed_locale {
            return vec![Some(fixed.clone())];
        }
        let Some(requested) = requested.filter(|l| !l.is_empty()) else {
            return vec![None];
        };

        let mut chain = Vec::new();
        let mut current = Some(requested);
        while let Some(tag) = current {
            chain.push(Some(tag.to_string()));
            current = parent_language(tag);
        }
        chain.push(None);
        chain
    }

    /// Call `loader(requested, candidate)` for each candidate until one is
    /// non-empty. The last candidate's result is returned even when empty.
    ///
    /// Loader errors abort the chain.
    pub fn resolve<T, F>(&self, requested: Option<&str>, mut loader: F) -> LexisResult<Resolved<T>>
    where
        T: FallbackResult,
        F: FnMut(Option<&str>, Option<&str>) -> LexisResult<T>,
    {
        let original = self.effective_language(requested).map(str::to_string);
        let mut candidates = self.candidates(requested);
        let last = candidates.pop().unwrap_or(None);

        for candidate in candidates {
            let value = loader(original.as_deref(), candidate.as_deref())?;
            if !value.is_empty_result() {
                return Ok(self.finish(value, original, candidate));
            }
            tracing::trace!(requested = ?original, candidate = ?candidate, "Fallback candidate empty");
        }

        let value = loader(original.as_deref(), last.as_deref())?;
        Ok(self.finish(value, original, last))
    }

    fn finish<T>(&self, value: T, requested: Option<String>, resolved: Option<String>) -> Resolved<T> {
        if requested != resolved {
            tracing::debug!(requested = ?requested, resolved = ?resolved, "Language fallback resolved");
        }
        Resolved {
            value,
            requested,
            resolved,
        }
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The chain has one candidate per subtag plus the default, each a
        /// prefix of the one before.
        #[test]
        fn prop_chain_shape(tag in "[a-z]{2,3}(_[a-z0-9]{1,4}){0,4}") {
            let chain = LanguageFallbackResolver::new().candidates(Some(&tag));
            prop_assert_eq!(chain.len(), tag.matches('_').count() + 2);
            prop_assert_eq!(chain.last(), Some(&None));
            for pair in chain.windows(2) {
                if let (Some(longer), Some(shorter)) = (&pair[0], &pair[1]) {
                    prop_assert!(longer.starts_with(shorter.as_str()));
                }
            }
        }
    }
}
