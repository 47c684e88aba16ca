// src/ingest/extract.rs
//! Ordered field-extraction strategies: each candidate is tried in sequence and
//! the first non-empty value wins. Adapters declare their fallbacks as data
//! instead of nesting `if let` chains.

use serde_json::Value;
use std::collections::HashMap;

/// One way to pull a value out of a parsed feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Text content of a child element (matched by local name).
    Text(&'static str),
    /// Attribute of a child element, e.g. Atom `<link href="..."/>`.
    Attr(&'static str, &'static str),
}

/// Child elements of one `<item>`/`<entry>`, keyed by local name.
/// Only the first occurrence of each element is kept.
#[derive(Debug, Default, Clone)]
pub struct EntryFields {
    pub text: HashMap<String, String>,
    pub attrs: HashMap<(String, String), String>,
}

impl EntryFields {
    pub fn get(&self, src: FieldSource) -> Option<&str> {
        match src {
            FieldSource::Text(el) => self.text.get(el).map(String::as_str),
            FieldSource::Attr(el, attr) => self
                .attrs
                .get(&(el.to_string(), attr.to_string()))
                .map(String::as_str),
        }
    }

    pub fn first(&self, chain: &[FieldSource]) -> Option<String> {
        first_non_empty(chain.iter().map(|s| self.get(*s)))
    }
}

/// First candidate that is present and not blank, trimmed.
pub fn first_non_empty<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Resolve a JSON path like `["source", "name"]`; strings and numbers only.
pub fn json_str(v: &Value, path: &[&str]) -> Option<String> {
    let mut cur = v;
    for key in path {
        cur = cur.get(*key)?;
    }
    match cur {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-empty value among several JSON paths.
pub fn json_first(v: &Value, paths: &[&[&str]]) -> Option<String> {
    let owned: Vec<Option<String>> = paths.iter().map(|p| json_str(v, p)).collect();
    first_non_empty(owned.iter().map(|o| o.as_deref()))
}
