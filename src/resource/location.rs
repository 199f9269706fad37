//! Base directory resolution and `${...}` placeholder expansion.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigResult, ConfigurationError};

/// Variables visible to base directory resolution.
///
/// `properties` stands in for process-level named settings that are not
/// environment variables (e.g. values passed on the command line).
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    properties: HashMap<String, String>,
    home: Option<PathBuf>,
}

impl Environment {
    /// Snapshot of the current process environment and home directory.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
            properties: HashMap::new(),
            home: dirs::home_dir(),
        }
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Expand `${env.NAME}` (environment) and `${name}` (property) placeholders.
    pub fn expand(&self, template: &str) -> ConfigResult<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| ConfigurationError::Placeholder(rest[start..].to_string()))?;
            let key = &after[..end];
            let value = match key.strip_prefix("env.") {
                Some(var) => self.var(var),
                None => self.property(key),
            };
            out.push_str(value.ok_or_else(|| ConfigurationError::Placeholder(key.to_string()))?);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Well-known configuration directories of the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformDirectory {
    /// Per-user configuration directory (`~/.config`, `%APPDATA%`, ...).
    UserConfig,
    /// System-wide configuration directory (`/etc` on unix).
    SystemConfig,
}

impl PlatformDirectory {
    pub const ALL: [PlatformDirectory; 2] =
        [PlatformDirectory::UserConfig, PlatformDirectory::SystemConfig];

    fn root(self) -> Option<PathBuf> {
        match self {
            PlatformDirectory::UserConfig => dirs::config_dir(),
            PlatformDirectory::SystemConfig => {
                if cfg!(unix) {
                    Some(PathBuf::from("/etc"))
                } else {
                    None
                }
            }
        }
    }
}

/// One candidate directory to search for the original resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseDirectory {
    /// Explicit path, may contain placeholders.
    Path(String),
    /// Directory named by an environment variable.
    EnvironmentVariable(String),
    /// Directory named by an environment property.
    Property(String),
    /// Path relative to the user's home directory.
    Home(PathBuf),
    /// Application subdirectory of a platform configuration directory.
    Platform(PlatformDirectory),
}

impl BaseDirectory {
    /// Resolve to a concrete path. `Ok(None)` means "not applicable here"
    /// (unresolved placeholder, variable unset, no home directory, platform
    /// without that directory).
    pub fn resolve(&self, env: &Environment, app_name: &str) -> ConfigResult<Option<PathBuf>> {
        let resolved = match self {
            BaseDirectory::Path(template) => match env.expand(template) {
                Ok(path) => Some(PathBuf::from(path)),
                Err(ConfigurationError::Placeholder(key)) => {
                    tracing::debug!(template = %template, placeholder = %key, "Skipping base directory with unresolved placeholder");
                    None
                }
                Err(e) => return Err(e),
            },
            BaseDirectory::EnvironmentVariable(name) => env.var(name).map(PathBuf::from),
            BaseDirectory::Property(name) => env.property(name).map(PathBuf::from),
            BaseDirectory::Home(relative) => env.home.as_ref().map(|home| home.join(relative)),
            BaseDirectory::Platform(platform) => platform.root().map(|root| root.join(app_name)),
        };
        Ok(resolved)
    }

    /// Home directory followed by every platform directory.
    pub fn default_search(app_name: &str) -> Vec<BaseDirectory> {
        let mut dirs = vec![BaseDirectory::Home(PathBuf::from(".config").join(app_name))];
        dirs.extend(PlatformDirectory::ALL.into_iter().map(BaseDirectory::Platform));
        dirs
    }
}
