//! Settings loading from disk.

use std::fs;
use std::path::Path;

use crate::error::{ConfigResult, ConfigurationError};
use crate::settings::schema::LivecfgSettings;
use crate::settings::validation::validate_settings;

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> ConfigResult<LivecfgSettings> {
    let content = fs::read_to_string(path)
        .map_err(|e| ConfigurationError::for_resource(path.display(), e.into()))?;
    parse_settings(&content).map_err(|e| ConfigurationError::for_resource(path.display(), e))
}

/// Parse and validate settings from TOML text.
pub fn parse_settings(content: &str) -> ConfigResult<LivecfgSettings> {
    let settings: LivecfgSettings = toml::from_str(content).map_err(|e| ConfigurationError::Parse {
        format: "TOML",
        message: e.to_string(),
    })?;
    validate_settings(&settings).map_err(ConfigurationError::InvalidSettings)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_settings_names_file_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("livecfg.toml");
        fs::write(&path, "reload_interval_ms = 10").unwrap();

        let err = load_settings(&path).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("livecfg.toml"));
        assert!(text.contains("reload_interval_ms"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            parse_settings("engine = \"yaml\""),
            Err(ConfigurationError::Parse { format: "TOML", .. })
        ));
    }
}
