//! Typed conversion out of [`Value`].

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use super::Value;

/// A value could not be converted to the requested type.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("expected {expected}, found {found}")]
pub struct ConversionError {
    pub expected: &'static str,
    pub found: String,
}

impl ConversionError {
    fn new(expected: &'static str, value: &Value) -> Self {
        Self {
            expected,
            found: format!("{} '{}'", value.kind(), value),
        }
    }
}

/// Types that can be produced from a configuration value.
pub trait FromValue: Sized + PartialEq {
    /// Human readable name of the target type.
    const TYPE_NAME: &'static str;

    /// Whether this type collects a list of values.
    const IS_LIST: bool = false;

    fn from_value(value: &Value) -> Result<Self, ConversionError>;

    /// Equality used for change detection. Must be reflexive, so a value
    /// resolved twice from the same snapshot is never reported as changed.
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Integer(_) | Value::Float(_) | Value::Boolean(_) => Ok(value.to_string()),
            _ => Err(ConversionError::new(Self::TYPE_NAME, value)),
        }
    }
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Ok(true),
                "false" | "no" | "off" => Ok(false),
                _ => Err(ConversionError::new(Self::TYPE_NAME, value)),
            },
            _ => Err(ConversionError::new(Self::TYPE_NAME, value)),
        }
    }
}

fn integer(value: &Value, expected: &'static str) -> Result<i64, ConversionError> {
    match value {
        Value::Integer(i) => Ok(*i),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ConversionError::new(expected, value)),
        _ => Err(ConversionError::new(expected, value)),
    }
}

macro_rules! integer_from_value {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const TYPE_NAME: &'static str = $name;

                fn from_value(value: &Value) -> Result<Self, ConversionError> {
                    let raw = integer(value, Self::TYPE_NAME)?;
                    <$ty>::try_from(raw).map_err(|_| ConversionError::new(Self::TYPE_NAME, value))
                }
            }
        )*
    };
}

integer_from_value! {
    i64 => "i64",
    i32 => "i32",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
}

impl FromValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(x) => Ok(*x),
            Value::Integer(i) => Ok(*i as f64),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ConversionError::new(Self::TYPE_NAME, value)),
            _ => Err(ConversionError::new(Self::TYPE_NAME, value)),
        }
    }

    // Bitwise, so NaN equals itself.
    fn same_value(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl FromValue for PathBuf {
    const TYPE_NAME: &'static str = "path";

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(s) => Ok(PathBuf::from(s)),
            _ => Err(ConversionError::new(Self::TYPE_NAME, value)),
        }
    }
}

impl FromValue for Url {
    const TYPE_NAME: &'static str = "URI";

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(s) => {
                Url::parse(s.trim()).map_err(|_| ConversionError::new(Self::TYPE_NAME, value))
            }
            _ => Err(ConversionError::new(Self::TYPE_NAME, value)),
        }
    }
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "value";

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }

    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a.same_value(b),
            (Value::List(a), Value::List(b)) => a.same_value(b),
            (Value::Table(a), Value::Table(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.same_value(vb))
            }
            _ => self == other,
        }
    }
}

/// Lists come either from a native list or a comma separated string.
impl<T: FromValue> FromValue for Vec<T> {
    const TYPE_NAME: &'static str = "list";
    const IS_LIST: bool = true;

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
            Value::String(s) => s
                .split(',')
                .map(|part| T::from_value(&Value::String(part.trim().to_string())))
                .collect(),
            other => T::from_value(other).map(|single| vec![single]),
        }
    }

    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }
}
