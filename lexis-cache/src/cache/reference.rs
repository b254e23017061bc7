//! Reference slots.
//!
//! A slot for a specific language may hold a [`CacheValue::Reference`] to the
//! slot of the broader language that actually answered, instead of a copy of
//! its payload. Reads follow references until they reach a payload or an
//! empty slot.

use std::sync::Arc;

use lexis_core::{BackendError, LexisResult, DEFAULT_MAX_REFERENCE_DEPTH};

use super::traits::{CacheStore, CacheValue};

/// A payload reached by following references.
#[derive(Debug, Clone, PartialEq)]
pub struct Materialized {
    /// Key of the slot that holds the payload.
    pub key: String,
    /// Never a reference.
    pub value: CacheValue,
    /// References followed to get here.
    pub hops: usize,
}

/// Follows and writes reference slots in one store.
pub struct ReferenceIndirection<S: CacheStore + ?Sized> {
    store: Arc<S>,
    max_depth: usize,
}

impl<S: CacheStore + ?Sized> ReferenceIndirection<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_max_depth(store, DEFAULT_MAX_REFERENCE_DEPTH)
    }

    pub fn with_max_depth(store: Arc<S>, max_depth: usize) -> Self {
        Self {
            store,
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolve `slot_key` to its payload.
    ///
    /// Returns `Ok(None)` when the slot, or any slot along the chain, is
    /// absent. A chain longer than the depth cap is reported as
    /// [`BackendError::ReferenceCycle`].
    pub fn materialize(&self, slot_key: &str) -> LexisResult<Option<Materialized>> {
        let mut current = slot_key.to_string();
        let mut hops = 0;
        loop {
            match self.store.get(&current)? {
                None => return Ok(None),
                Some(CacheValue::Reference(target)) => {
                    hops += 1;
                    if hops > self.max_depth {
                        return Err(BackendError::ReferenceCycle {
                            key: slot_key.to_string(),
                            depth: self.max_depth,
                        }
                        .into());
                    }
                    tracing::trace!(from = %current, to = %target, "Following cache reference");
                    current = target;
                }
                Some(value) => {
                    return Ok(Some(Materialized {
                        key: current,
                        value,
                        hops,
                    }))
                }
            }
        }
    }

    /// Point `specific_key` at the slot that answers for `resolved_key`.
    ///
    /// The reference targets the end of `resolved_key`'s own chain so reads
    /// take a single hop. Returns true if a reference was written.
    pub fn alias(&self, specific_key: &str, resolved_key: &str) -> LexisResult<bool> {
        if specific_key == resolved_key {
            return Ok(false);
        }

        let target = match self.materialize(resolved_key)? {
            Some(materialized) => materialized.key,
            None => resolved_key.to_string(),
        };
        if target == specific_key {
            return Ok(false);
        }

        if let Some(CacheValue::Reference(existing)) = self.store.get(specific_key)? {
            if existing == target {
                return Ok(false);
            }
        }

        tracing::debug!(key = %specific_key, target = %target, "Writing cache reference");
        self.store.set(specific_key, CacheValue::Reference(target))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use lexis_core::{DictionaryEntry, LexisError};

    fn payload() -> CacheValue {
        CacheValue::Entries(vec![DictionaryEntry::enumeration("user.gender", 1, "男")])
    }

    fn setup() -> (Arc<MemoryCacheStore>, ReferenceIndirection<MemoryCacheStore>) {
        let store = Arc::new(MemoryCacheStore::new());
        let refs = ReferenceIndirection::new(Arc::clone(&store));
        (store, refs)
    }

    #[test]
    fn test_materialize_payload_directly() {
        let (store, refs) = setup();
        store.set("k:zh", payload()).unwrap();
        let found = refs.materialize("k:zh").unwrap().unwrap();
        assert_eq!(found.key, "k:zh");
        assert_eq!(found.hops, 0);
        assert_eq!(found.value, payload());
    }

    #[test]
    fn test_materialize_follows_chain() {
        let (store, refs) = setup();
        store.set("k", payload()).unwrap();
        store.set("k:zh", CacheValue::Reference("k".to_string())).unwrap();
        store.set("k:zh_cn", CacheValue::Reference("k:zh".to_string())).unwrap();

        let found = refs.materialize("k:zh_cn").unwrap().unwrap();
        assert_eq!(found.key, "k");
        assert_eq!(found.hops, 2);
        assert_eq!(found.value, payload());
    }

    #[test]
    fn test_materialize_dangling_reference_is_absent() {
        let (store, refs) = setup();
        store.set("k:zh_cn", CacheValue::Reference("k:zh".to_string())).unwrap();
        assert_eq!(refs.materialize("k:zh_cn").unwrap(), None);
        assert_eq!(refs.materialize("missing").unwrap(), None);
    }

    #[test]
    fn test_materialize_cycle_is_backend_error() {
        let (store, refs) = setup();
        store.set("a", CacheValue::Reference("b".to_string())).unwrap();
        store.set("b", CacheValue::Reference("a".to_string())).unwrap();

        let err = refs.materialize("a").unwrap_err();
        assert!(err.is_backend());
        assert!(matches!(
            err,
            LexisError::Backend(BackendError::ReferenceCycle { depth: 8, .. })
        ));
    }

    #[test]
    fn test_alias_targets_end_of_chain() {
        let (store, refs) = setup();
        store.set("k", payload()).unwrap();
        store.set("k:zh", CacheValue::Reference("k".to_string())).unwrap();

        assert!(refs.alias("k:zh_cn", "k:zh").unwrap());
        assert_eq!(
            store.get("k:zh_cn").unwrap(),
            Some(CacheValue::Reference("k".to_string()))
        );
        // Already pointing at the same place.
        assert!(!refs.alias("k:zh_cn", "k:zh").unwrap());
    }

    #[test]
    fn test_alias_never_creates_self_reference() {
        let (store, refs) = setup();
        store.set("k", CacheValue::Reference("k:zh".to_string())).unwrap();
        store.set("k:zh", payload()).unwrap();

        assert!(!refs.alias("k:zh", "k:zh").unwrap());
        // "k" resolves to "k:zh"; aliasing "k:zh" to it would loop.
        assert!(!refs.alias("k:zh", "k").unwrap());
        assert_eq!(store.get("k:zh").unwrap(), Some(payload()));
    }
}
