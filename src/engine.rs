//! Supported document formats and their loaders.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::loader::{ConfigurationSourceLoader, JsonLoader, PropertiesLoader, TomlLoader, XmlLoader};

/// Closed set of configuration formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Properties,
    Toml,
    Json,
    Xml,
}

impl Engine {
    pub const ALL: [Engine; 4] = [Engine::Properties, Engine::Toml, Engine::Json, Engine::Xml];

    /// File extension used when no explicit naming is configured.
    pub fn default_extension(self) -> &'static str {
        match self {
            Engine::Properties => "properties",
            Engine::Toml => "toml",
            Engine::Json => "json",
            Engine::Xml => "xml",
        }
    }

    pub fn loader(self) -> Arc<dyn ConfigurationSourceLoader> {
        match self {
            Engine::Properties => Arc::new(PropertiesLoader),
            Engine::Toml => Arc::new(TomlLoader),
            Engine::Json => Arc::new(JsonLoader),
            Engine::Xml => Arc::new(XmlLoader),
        }
    }

    /// Guess the engine from a file extension.
    pub fn for_extension(extension: &str) -> Option<Engine> {
        Self::ALL
            .into_iter()
            .find(|e| e.default_extension().eq_ignore_ascii_case(extension))
    }
}

impl FromStr for Engine {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "properties" | "props" => Ok(Engine::Properties),
            "toml" => Ok(Engine::Toml),
            "json" => Ok(Engine::Json),
            "xml" => Ok(Engine::Xml),
            _ => Err(ConfigurationError::UnknownEngine(s.to_string())),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Engine::Properties => "properties",
            Engine::Toml => "toml",
            Engine::Json => "json",
            Engine::Xml => "xml",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_engine_names() {
        assert_eq!("PROPS".parse::<Engine>().unwrap(), Engine::Properties);
        assert_eq!("Toml".parse::<Engine>().unwrap(), Engine::Toml);
        assert_eq!("xml".parse::<Engine>().unwrap(), Engine::Xml);
        assert!(matches!(
            "xmlbeans".parse::<Engine>(),
            Err(ConfigurationError::UnknownEngine(name)) if name == "xmlbeans"
        ));
    }

    #[test]
    fn test_extensions_and_loaders() {
        assert_eq!(Engine::Json.default_extension(), "json");
        assert_eq!(Engine::for_extension("TOML"), Some(Engine::Toml));
        assert_eq!(Engine::for_extension("xml"), Some(Engine::Xml));
        assert_eq!(Engine::for_extension("yaml"), None);
        assert_eq!(Engine::Toml.loader().format(), "TOML");
        assert_eq!(Engine::Xml.loader().format(), "XML");
    }
}
