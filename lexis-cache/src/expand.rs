//! Flat dot-namespaced entries to a nested tree.
//!
//! ```text
//! a.b (ENUM, code 1) ─┐
//! a.b (ENUM, code 2) ─┼─>  { "a": { "b": [ {..code 1..}, {..code 2..} ], "c": "Z" } }
//! a.c (TEXT "Z")     ─┘
//! ```
//!
//! Entries sharing a leaf collapse into a list in input order.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use lexis_core::{DictionaryConfig, DictionaryEntry, EntryType};
use serde_json::Value;

use crate::cache::DictionaryTree;

enum Node {
    Branch(BTreeMap<String, Node>),
    Leaf(Value),
    List(Vec<Value>),
}

impl Node {
    fn into_value(self) -> Value {
        match self {
            Node::Branch(children) => Value::Object(into_tree(children)),
            Node::Leaf(value) => value,
            Node::List(items) => Value::Array(items),
        }
    }
}

fn into_tree(children: BTreeMap<String, Node>) -> DictionaryTree {
    children
        .into_iter()
        .map(|(key, node)| (key, node.into_value()))
        .collect()
}

/// Builds the expanded tree of a dictionary.
#[derive(Debug, Clone)]
pub struct TreeExpander {
    key_delimiter: String,
    expand_fields: Vec<String>,
}

impl TreeExpander {
    /// `expand_fields` lists the serialized field names kept for `ENUM`
    /// entries; empty keeps the whole entry.
    pub fn new(key_delimiter: impl Into<String>, expand_fields: Vec<String>) -> Self {
        Self {
            key_delimiter: key_delimiter.into(),
            expand_fields,
        }
    }

    pub fn from_config(config: &DictionaryConfig) -> Self {
        Self::new(config.key_delimiter.clone(), config.expand_fields.clone())
    }

    /// Display payload of one entry.
    pub fn payload(&self, entry: &DictionaryEntry) -> Value {
        match entry.entry_type {
            EntryType::Text => entry.text.clone().map(Value::String).unwrap_or(Value::Null),
            EntryType::Enum => {
                let full = serde_json::to_value(entry).unwrap_or(Value::Null);
                if self.expand_fields.is_empty() {
                    return full;
                }
                match full {
                    Value::Object(fields) => Value::Object(
                        fields
                            .into_iter()
                            .filter(|(name, _)| self.expand_fields.contains(name))
                            .collect(),
                    ),
                    other => other,
                }
            }
        }
    }

    /// Expand enabled entries; disabled ones are skipped.
    pub fn expand(&self, entries: &[DictionaryEntry]) -> DictionaryTree {
        let mut root = BTreeMap::new();
        for entry in entries.iter().filter(|e| e.enabled) {
            self.insert(&mut root, entry);
        }
        into_tree(root)
    }

    fn insert(&self, root: &mut BTreeMap<String, Node>, entry: &DictionaryEntry) {
        let segments: Vec<&str> = entry
            .key
            .split(self.key_delimiter.as_str())
            .filter(|s| !s.is_empty())
            .collect();
        let Some((last, head)) = segments.split_last() else {
            return;
        };

        let mut current = root;
        for segment in head {
            let node = current
                .entry((*segment).to_string())
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            match node {
                Node::Branch(children) => current = children,
                _ => {
                    tracing::warn!(
                        key = %entry.key,
                        segment = %segment,
                        "Dictionary key passes through a leaf, skipping entry"
                    );
                    return;
                }
            }
        }

        let payload = self.payload(entry);
        match current.entry((*last).to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(Node::Leaf(payload));
            }
            Entry::Occupied(mut slot) => {
                let node = slot.get_mut();
                match node {
                    Node::List(items) => items.push(payload),
                    Node::Leaf(existing) => {
                        let first = std::mem::take(existing);
                        *node = Node::List(vec![first, payload]);
                    }
                    Node::Branch(_) => {
                        tracing::warn!(
                            key = %entry.key,
                            "Dictionary key names an interior node, skipping entry"
                        );
                    }
                }
            }
        }
    }
}

impl Default for TreeExpander {
    fn default() -> Self {
        Self::from_config(&DictionaryConfig::default())
    }
}
