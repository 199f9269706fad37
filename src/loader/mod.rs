//! Format-specific parsing of resource bytes into configuration sources.
//!
//! # Data Flow
//! ```text
//! resource stream
//!     → read_text (bounded read + decode with optional encoding override)
//!     → properties.rs / tree.rs / xml.rs (format-specific parse)
//!     → Arc<dyn ConfigurationSource>
//! ```
//!
//! # Design Decisions
//! - Loaders are stateless and shared between the defaults, last-good and
//!   original loads of one manager
//! - Malformed input is a `ConfigurationError::Parse` carrying the
//!   format-specific diagnostic; the caller adds the resource identity

pub mod properties;
pub mod tree;
pub mod xml;

use std::fmt;
use std::io::Read;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ConfigResult, ConfigurationError};
use crate::source::ConfigurationSource;

pub use properties::PropertiesLoader;
pub use tree::{JsonLoader, TomlLoader};
pub use xml::XmlLoader;

/// Upper bound on the bytes read from a single resource.
pub const MAX_RESOURCE_BYTES: u64 = 16 * 1024 * 1024;

/// Turns a byte stream into a configuration source.
pub trait ConfigurationSourceLoader: Send + Sync + fmt::Debug {
    /// Name of the format, used in diagnostics.
    fn format(&self) -> &'static str;

    /// Parse the stream. `None` for `encoding` means the loader default (UTF-8).
    fn parse(
        &self,
        reader: &mut dyn Read,
        encoding: Option<Encoding>,
    ) -> ConfigResult<Arc<dyn ConfigurationSource>>;
}

/// Character encodings accepted as an override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Latin1 => "ISO-8859-1",
        }
    }

    fn decode(self, bytes: Vec<u8>) -> ConfigResult<String> {
        match self {
            Encoding::Utf8 => {
                let mut text = String::from_utf8(bytes)
                    .map_err(|_| ConfigurationError::Encoding { encoding: self.name() })?;
                if text.starts_with('\u{feff}') {
                    text.remove(0);
                }
                Ok(text)
            }
            Encoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Encoding::Latin1),
            other => Err(format!("unsupported encoding '{}'", other)),
        }
    }
}

/// Read at most [`MAX_RESOURCE_BYTES`] and decode them.
pub fn read_text(reader: &mut dyn Read, encoding: Option<Encoding>) -> ConfigResult<String> {
    let mut bytes = Vec::new();
    reader
        .take(MAX_RESOURCE_BYTES + 1)
        .read_to_end(&mut bytes)?;
    if bytes.len() as u64 > MAX_RESOURCE_BYTES {
        return Err(ConfigurationError::TooLarge {
            limit: MAX_RESOURCE_BYTES,
        });
    }
    encoding.unwrap_or_default().decode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_names() {
        assert_eq!("UTF-8".parse::<Encoding>(), Ok(Encoding::Utf8));
        assert_eq!("latin1".parse::<Encoding>(), Ok(Encoding::Latin1));
        assert!("ebcdic".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_read_text_decodes_latin1_and_strips_bom() {
        let mut latin: &[u8] = &[b'c', 0xe9];
        assert_eq!(read_text(&mut latin, Some(Encoding::Latin1)).unwrap(), "cé");

        let mut bom: &[u8] = b"\xef\xbb\xbfa=1";
        assert_eq!(read_text(&mut bom, None).unwrap(), "a=1");

        let mut invalid: &[u8] = &[0xff, 0xfe];
        assert!(matches!(
            read_text(&mut invalid, None),
            Err(ConfigurationError::Encoding { encoding: "UTF-8" })
        ));
    }
}
