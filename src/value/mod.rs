//! Format-agnostic value model.
//!
//! # Data Flow
//! ```text
//! loader (properties / TOML / JSON)
//!     → Value tree (owned, immutable once inside a source)
//!     → convert.rs (FromValue) on resolution
//!     → typed value handed to a ValueDefinition
//! ```
//!
//! # Design Decisions
//! - One value tree for every format so sources stay format-agnostic
//! - Properties values are plain strings; conversion parses them on demand
//! - Conversions never panic; failures carry the expected type name

pub mod convert;

use std::collections::BTreeMap;
use std::fmt;

pub use convert::{ConversionError, FromValue};

/// A single configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<Value>),
    Table(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the variant, used in conversion diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::List(_) => "list",
            Value::Table(_) => "table",
        }
    }

    /// Look up a dotted path below this value.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.') {
            match current {
                Value::Table(entries) => current = entries.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Table(entries) => write!(f, "{{{} entries}}", entries.len()),
        }
    }
}

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Integer(i),
            toml::Value::Float(x) => Value::Float(x),
            toml::Value::Boolean(b) => Value::Boolean(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            toml::Value::Table(entries) => Value::Table(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// JSON `null` has no counterpart; null members and elements are dropped.
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        json_value(value).unwrap_or_else(|| Value::Table(BTreeMap::new()))
    }
}

fn json_value(value: serde_json::Value) -> Option<Value> {
    let converted = match value {
        serde_json::Value::Null => return None,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::List(items.into_iter().filter_map(json_value).collect())
        }
        serde_json::Value::Object(entries) => Value::Table(
            entries
                .into_iter()
                .filter_map(|(k, v)| json_value(v).map(|v| (k, v)))
                .collect(),
        ),
    };
    Some(converted)
}
