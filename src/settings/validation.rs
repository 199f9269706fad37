//! Settings validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: `&LivecfgSettings → Result<(), Vec<ValidationError>>`
//! - Runs before any resource is touched

use std::fmt;
use std::str::FromStr;

use crate::loader::Encoding;
use crate::reload::MINIMUM_RELOAD_INTERVAL;
use crate::resource::ApplicationVersion;
use crate::settings::schema::{LivecfgSettings, LocationKind, LocationSettings};

/// One semantic problem with a settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_settings(settings: &LivecfgSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.name.trim().is_empty() {
        errors.push(ValidationError::new("name", "must not be empty"));
    }

    let minimum = MINIMUM_RELOAD_INTERVAL.as_millis() as u64;
    if settings.reload_interval_ms != 0 && settings.reload_interval_ms < minimum {
        errors.push(ValidationError::new(
            "reload_interval_ms",
            format!("must be 0 (disabled) or at least {minimum}"),
        ));
    }

    check_encoding("encoding", settings.encoding.as_deref(), &mut errors);

    if let Some(defaults) = &settings.defaults {
        if defaults.path.trim().is_empty() {
            errors.push(ValidationError::new("defaults.path", "must not be empty"));
        }
        check_encoding("defaults.encoding", defaults.encoding.as_deref(), &mut errors);
    }

    if let Some(path) = &settings.path {
        if path.trim().is_empty() {
            errors.push(ValidationError::new("path", "must not be empty"));
        }
        if !settings.locations.is_empty() {
            errors.push(ValidationError::new("path", "cannot be combined with locations"));
        }
    }

    for (i, location) in settings.locations.iter().enumerate() {
        if let Err(message) = check_location(location) {
            errors.push(ValidationError::new(format!("locations[{i}]"), message));
        }
    }

    if let Some(version) = &settings.version {
        if let Err(message) = ApplicationVersion::from_str(version) {
            errors.push(ValidationError::new("version", message));
        }
    }

    for (field, value) in [
        ("naming.prefix", &settings.naming.prefix),
        ("naming.extension", &settings.naming.extension),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_encoding(field: &str, encoding: Option<&str>, errors: &mut Vec<ValidationError>) {
    if let Some(Err(message)) = encoding.map(Encoding::from_str) {
        errors.push(ValidationError::new(field, message));
    }
}

fn check_location(location: &LocationSettings) -> Result<(), String> {
    let value = location.value.as_deref().map(str::trim).filter(|v| !v.is_empty());
    match (location.kind, value) {
        (LocationKind::Home, _) => Ok(()),
        (LocationKind::Platform, Some("user-config" | "system-config")) => Ok(()),
        (LocationKind::Platform, Some(other)) => Err(format!(
            "unknown platform directory '{other}' (expected user-config or system-config)"
        )),
        (_, None) => Err("value is required".to_string()),
        (_, Some(_)) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::schema::DefaultsSettings;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(validate_settings(&LivecfgSettings::default()).is_ok());
    }

    #[test]
    fn test_all_errors_reported() {
        let settings = LivecfgSettings {
            name: " ".into(),
            reload_interval_ms: 100,
            encoding: Some("ebcdic".into()),
            path: Some("/etc/app.toml".into()),
            defaults: Some(DefaultsSettings {
                path: String::new(),
                encoding: None,
            }),
            locations: vec![
                LocationSettings {
                    kind: LocationKind::EnvironmentVariable,
                    value: None,
                },
                LocationSettings {
                    kind: LocationKind::Platform,
                    value: Some("desktop".into()),
                },
            ],
            version: Some("one".into()),
            ..Default::default()
        };

        let errors = validate_settings(&settings).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "name",
                "reload_interval_ms",
                "encoding",
                "defaults.path",
                "path",
                "locations[0]",
                "locations[1]",
                "version"
            ]
        );
    }

    #[test]
    fn test_zero_interval_disables_reload() {
        let settings = LivecfgSettings {
            reload_interval_ms: 0,
            ..Default::default()
        };
        assert!(validate_settings(&settings).is_ok());
    }
}
