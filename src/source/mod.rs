//! Queryable, immutable views over one parsed configuration document.
//!
//! # Responsibilities
//! - Answer "is there a value at path X" and "give me X as type T"
//! - Stay format-agnostic: loaders build one of the concrete sources here
//! - Layer the live snapshot over the defaults snapshot during resolution
//!
//! # Design Decisions
//! - Sources are never mutated after construction and are shared via `Arc`
//! - Paths are dotted (`server.timeout`)

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ConfigResult, ConfigurationError};
use crate::value::{FromValue, Value};

/// Immutable view over one configuration document.
pub trait ConfigurationSource: Send + Sync + fmt::Debug {
    /// Raw value at `path`, if any.
    fn value(&self, path: &str) -> Option<&Value>;

    /// Every leaf path in the document, sorted.
    fn paths(&self) -> Vec<String>;

    /// Whether a value exists at `path`.
    fn is_available(&self, path: &str) -> bool {
        self.value(path).is_some()
    }
}

impl<'s> dyn ConfigurationSource + 's {
    /// Resolve `path` as `T`, failing when it is absent or mistyped.
    pub fn retrieve<T: FromValue>(&self, path: &str) -> ConfigResult<T> {
        self.retrieve_optional(path)?
            .ok_or_else(|| ConfigurationError::Missing(path.to_string()))
    }

    /// Resolve `path` as `T`; absence is `Ok(None)`, a type mismatch is an error.
    pub fn retrieve_optional<T: FromValue>(&self, path: &str) -> ConfigResult<Option<T>> {
        match self.value(path) {
            None => Ok(None),
            Some(value) => T::from_value(value)
                .map(Some)
                .map_err(|e| ConfigurationError::Conversion {
                    path: path.to_string(),
                    expected: e.expected,
                    found: e.found,
                }),
        }
    }
}

/// Source over a nested value tree (TOML, JSON).
#[derive(Debug, Clone)]
pub struct TreeSource {
    root: Value,
}

impl TreeSource {
    pub fn new(root: Value) -> Self {
        Self { root }
    }
}

impl ConfigurationSource for TreeSource {
    fn value(&self, path: &str) -> Option<&Value> {
        self.root.lookup(path)
    }

    fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_leaves(&self.root, String::new(), &mut out);
        out
    }
}

fn collect_leaves(value: &Value, prefix: String, out: &mut Vec<String>) {
    match value {
        Value::Table(entries) => {
            for (key, child) in entries {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                collect_leaves(child, path, out);
            }
        }
        _ if !prefix.is_empty() => out.push(prefix),
        _ => {}
    }
}

/// Source over flat `key = value` entries.
#[derive(Debug, Clone, Default)]
pub struct PropertiesSource {
    entries: BTreeMap<String, Value>,
}

impl PropertiesSource {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ConfigurationSource for PropertiesSource {
    fn value(&self, path: &str) -> Option<&Value> {
        self.entries.get(path)
    }

    fn paths(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Resolves against `primary` first and falls back to `fallback`.
#[derive(Debug, Clone, Copy)]
pub struct LayeredSource<'a> {
    primary: Option<&'a dyn ConfigurationSource>,
    fallback: Option<&'a dyn ConfigurationSource>,
}

impl<'a> LayeredSource<'a> {
    pub fn new(
        primary: Option<&'a dyn ConfigurationSource>,
        fallback: Option<&'a dyn ConfigurationSource>,
    ) -> Self {
        Self { primary, fallback }
    }
}

impl ConfigurationSource for LayeredSource<'_> {
    fn value(&self, path: &str) -> Option<&Value> {
        self.primary
            .and_then(|s| s.value(path))
            .or_else(|| self.fallback.and_then(|s| s.value(path)))
    }

    fn paths(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .primary
            .into_iter()
            .chain(self.fallback)
            .flat_map(|s| s.paths())
            .collect();
        all.sort();
        all.dedup();
        all
    }
}
