//! Lexis Core - Entity Types
//!
//! Dictionary rows, the language catalog, errors and configuration shared by
//! every Lexis crate. This crate performs no I/O.

mod config;
mod entities;
mod error;
mod identity;
pub mod language;

pub use config::*;
pub use entities::*;
pub use error::*;
pub use identity::*;
pub use language::{normalize_language, normalize_optional, parent_language, DisplayNames, StaticDisplayNames};
