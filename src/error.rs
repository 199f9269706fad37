//! Error taxonomy for snapshot loading, value resolution and assembly.

use thiserror::Error;

use crate::settings::validation::ValidationError;

/// Errors raised by the configuration framework.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document was malformed for its format.
    #[error("{format} parse error: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    /// The document bytes are not valid in the requested encoding.
    #[error("content is not valid {encoding}")]
    Encoding { encoding: &'static str },

    /// The resource is larger than a single load is allowed to read.
    #[error("resource exceeds the {limit} byte read limit")]
    TooLarge { limit: u64 },

    /// A load failure, tagged with the identity of the resource.
    #[error("resource '{resource}': {source}")]
    Load {
        resource: String,
        #[source]
        source: Box<ConfigurationError>,
    },

    /// No value exists at the given path.
    #[error("no value available at '{0}'")]
    Missing(String),

    /// A value exists but has the wrong shape for the requested type.
    #[error("value at '{path}' cannot be converted to {expected}: {found}")]
    Conversion {
        path: String,
        expected: &'static str,
        found: String,
    },

    /// One or more required values of a group could not be resolved.
    #[error("group '{group}' has unresolved required values: {}", join(.failures))]
    Unresolved {
        group: String,
        failures: Vec<ConfigurationError>,
    },

    /// Engine name outside the supported set.
    #[error("unknown engine '{0}' (expected properties, toml, json or xml)")]
    UnknownEngine(String),

    /// None of the configured base directories exist.
    #[error("none of the base directories resolved to an existing directory: {0}")]
    NoBaseDirectory(String),

    /// A `${...}` placeholder had no value.
    #[error("unresolved placeholder '{0}'")]
    Placeholder(String),

    /// Neither latest, last-good nor defaults produced a snapshot.
    #[error("no configuration snapshot could be loaded for '{0}'")]
    NoConfiguration(String),

    /// Framework settings failed validation.
    #[error("invalid settings: {}", join(.0))]
    InvalidSettings(Vec<ValidationError>),

    /// A resource identity could not be expressed as a URI.
    #[error("invalid resource URI '{0}'")]
    InvalidUri(String),
}

impl ConfigurationError {
    /// Wrap an error with the identity of the resource being loaded.
    pub fn for_resource(resource: impl std::fmt::Display, source: ConfigurationError) -> Self {
        ConfigurationError::Load {
            resource: resource.to_string(),
            source: Box::new(source),
        }
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_names_resource() {
        let err = ConfigurationError::for_resource(
            "/etc/app/app.toml",
            ConfigurationError::Parse {
                format: "TOML",
                message: "expected `=`".into(),
            },
        );
        let text = err.to_string();
        assert!(text.contains("/etc/app/app.toml"));
        assert!(text.contains("expected `=`"));
    }

    #[test]
    fn test_unresolved_lists_every_failure() {
        let err = ConfigurationError::Unresolved {
            group: "db".into(),
            failures: vec![
                ConfigurationError::Missing("db.url".into()),
                ConfigurationError::Missing("db.pool".into()),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("db.url"));
        assert!(text.contains("db.pool"));
    }
}
