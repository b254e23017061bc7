//! Dictionary and language entities

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::identity::{compute_content_token, ContentToken, EntryId, Timestamp};
use crate::language::normalize_language;

/// How an entry is rendered in the expanded tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    /// Rendered as its raw `text`.
    #[default]
    Text,
    /// Rendered as the entry itself (or its projected fields).
    Enum,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Text => "TEXT",
            EntryType::Enum => "ENUM",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_enabled() -> bool {
    true
}

/// One lookup value of a dictionary group.
///
/// Equality and hashing go through [`DictionaryEntry::content_token`]: two
/// entries are the same value when id, type, key, code, alias and text match,
/// whatever their status or timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryEntry {
    #[serde(default)]
    pub id: Option<EntryId>,
    #[serde(rename = "type", default)]
    pub entry_type: EntryType,
    pub key: String,
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub create_time: Option<Timestamp>,
    #[serde(default)]
    pub update_time: Option<Timestamp>,
}

impl DictionaryEntry {
    /// A `TEXT` entry carrying a single display string.
    pub fn text(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: None,
            entry_type: EntryType::Text,
            key: key.into(),
            code: None,
            alias: None,
            text: Some(text.into()),
            enabled: true,
            create_time: None,
            update_time: None,
        }
    }

    /// An `ENUM` entry identified by `code` within its key group.
    pub fn enumeration(key: impl Into<String>, code: i32, text: impl Into<String>) -> Self {
        Self {
            entry_type: EntryType::Enum,
            code: Some(code),
            ..Self::text(key, text)
        }
    }

    pub fn with_id(mut self, id: EntryId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn content_token(&self) -> ContentToken {
        let id = self.id.map(|id| id.to_string()).unwrap_or_default();
        let code = self.code.map(|code| code.to_string()).unwrap_or_default();
        compute_content_token(&[
            &id,
            self.entry_type.as_str(),
            &self.key,
            &code,
            self.alias.as_deref().unwrap_or(""),
            self.text.as_deref().unwrap_or(""),
        ])
    }

    /// Fill the fields a freshly inserted row must carry.
    pub fn apply_create_defaults(&mut self, id: EntryId, now: Timestamp) {
        if self.id.is_none() {
            self.id = Some(id);
        }
        if self.create_time.is_none() {
            self.create_time = Some(now);
        }
        self.update_time = None;
    }

    pub fn touch(&mut self, now: Timestamp) {
        self.update_time = Some(now);
    }

    /// Whether `code` selects this entry. `None` selects every entry of the key.
    pub fn matches_code(&self, code: Option<i32>) -> bool {
        code.is_none() || self.code == code
    }
}

impl PartialEq for DictionaryEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.entry_type == other.entry_type
            && self.key == other.key
            && self.code == other.code
            && self.alias == other.alias
            && self.text == other.text
    }
}

impl Eq for DictionaryEntry {}

impl Hash for DictionaryEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.entry_type.hash(state);
        self.key.hash(state);
        self.code.hash(state);
        self.alias.hash(state);
        self.text.hash(state);
    }
}

/// A language of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageEntry {
    #[serde(default)]
    pub id: Option<EntryId>,
    pub lang: String,
    pub label: String,
    #[serde(default)]
    pub order_index: Option<i32>,
    #[serde(default)]
    pub create_time: Option<Timestamp>,
    /// Label as shown to the requesting locale; never persisted or cached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_label: Option<String>,
}

impl LanguageEntry {
    pub fn new(lang: impl Into<String>, label: impl Into<String>) -> Self {
        let lang = lang.into();
        Self {
            lang: normalize_language(&lang).ok().flatten().unwrap_or(lang),
            label: label.into(),
            id: None,
            order_index: None,
            create_time: None,
            display_label: None,
        }
    }

    pub fn with_order_index(mut self, order_index: i32) -> Self {
        self.order_index = Some(order_index);
        self
    }

    /// The tag in normalized form, e.g. `zh_cn` for a stored `zh-CN`.
    pub fn language(&self) -> String {
        normalize_language(&self.lang)
            .ok()
            .flatten()
            .unwrap_or_else(|| self.lang.trim().to_lowercase())
    }

    /// Whether `other` names this language once both are normalized.
    pub fn same_language(&self, other: &str) -> bool {
        match normalize_language(other) {
            Ok(Some(other)) => self.language() == other,
            _ => false,
        }
    }

    pub fn with_display_label(mut self, display_label: impl Into<String>) -> Self {
        self.display_label = Some(display_label.into());
        self
    }
}
