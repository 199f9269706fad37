//! Nested documents: TOML and JSON.

use std::io::Read;
use std::sync::Arc;

use crate::error::{ConfigResult, ConfigurationError};
use crate::loader::{read_text, ConfigurationSourceLoader, Encoding};
use crate::source::{ConfigurationSource, TreeSource};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlLoader;

impl ConfigurationSourceLoader for TomlLoader {
    fn format(&self) -> &'static str {
        "TOML"
    }

    fn parse(
        &self,
        reader: &mut dyn Read,
        encoding: Option<Encoding>,
    ) -> ConfigResult<Arc<dyn ConfigurationSource>> {
        let text = read_text(reader, encoding)?;
        let table: toml::Table = toml::from_str(&text).map_err(|e| ConfigurationError::Parse {
            format: self.format(),
            message: e.to_string(),
        })?;
        Ok(Arc::new(TreeSource::new(Value::from(toml::Value::Table(
            table,
        )))))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLoader;

impl ConfigurationSourceLoader for JsonLoader {
    fn format(&self) -> &'static str {
        "JSON"
    }

    fn parse(
        &self,
        reader: &mut dyn Read,
        encoding: Option<Encoding>,
    ) -> ConfigResult<Arc<dyn ConfigurationSource>> {
        let text = read_text(reader, encoding)?;
        let doc: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ConfigurationError::Parse {
                format: self.format(),
                message: e.to_string(),
            })?;
        if !doc.is_object() {
            return Err(ConfigurationError::Parse {
                format: self.format(),
                message: "document root must be an object".into(),
            });
        }
        Ok(Arc::new(TreeSource::new(Value::from(doc))))
    }
}
