//! Lexis Cache - Dictionary Caching and Language Fallback
//!
//! Serves dictionary lookups from a namespaced cache. A read for `zh_cn`
//! probes `zh_cn`, then `zh`, then the default language; when a broader
//! language answers, the `zh_cn` slot becomes a reference to the slot that
//! answered instead of a copy of its payload.
//!
//! - [`DictionaryCache`]: read-through orchestrator and reload entry points
//! - [`DictionaryManager`]: filtered reads and writes with cache maintenance
//! - [`cache`]: stores, keys, fallback and references
//! - [`expand`]: flat entries to a nested tree

pub mod cache;
mod dictionary_cache;
pub mod expand;
mod manager;
mod memory_store;
mod query;
mod repository;

pub use cache::*;
pub use dictionary_cache::DictionaryCache;
pub use expand::TreeExpander;
pub use manager::DictionaryManager;
pub use memory_store::InMemoryDictionaryStore;
pub use query::{QueryError, QueryProvider};
pub use repository::DictionaryRepository;
