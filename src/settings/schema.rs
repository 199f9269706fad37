//! Settings schema.
//!
//! Describes where the application's configuration lives and how it is
//! polled. All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

use crate::engine::Engine;

/// Root settings for one configuration service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LivecfgSettings {
    /// Application name: default file prefix and platform subdirectory.
    pub name: String,

    /// Document format of the original, last-good and defaults resources.
    pub engine: Engine,

    /// Fixed original resource. Mutually exclusive with `locations`.
    pub path: Option<String>,

    /// Polling period in milliseconds; `0` disables periodic reload.
    pub reload_interval_ms: u64,

    /// Encoding override for the original and last-good resources.
    pub encoding: Option<String>,

    /// Bundled baseline configuration.
    pub defaults: Option<DefaultsSettings>,

    /// Ordered base directories to search; empty means the default search.
    pub locations: Vec<LocationSettings>,

    pub naming: NamingSettings,

    /// Application version for version-specific file names (`1.2.3`).
    pub version: Option<String>,
}

impl Default for LivecfgSettings {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            engine: Engine::default(),
            path: None,
            reload_interval_ms: 30_000,
            encoding: None,
            defaults: None,
            locations: Vec::new(),
            naming: NamingSettings::default(),
            version: None,
        }
    }
}

/// Defaults resource.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DefaultsSettings {
    /// File path, may contain `${...}` placeholders.
    pub path: String,

    #[serde(default)]
    pub encoding: Option<String>,
}

/// Kind of a search location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationKind {
    Path,
    EnvironmentVariable,
    Property,
    Home,
    Platform,
}

/// One base directory entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocationSettings {
    pub kind: LocationKind,

    /// Path, variable or property name, home-relative path, or
    /// `user-config` / `system-config` for platform entries.
    #[serde(default)]
    pub value: Option<String>,
}

/// File naming overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NamingSettings {
    /// File name prefix (default: `name`).
    pub prefix: Option<String>,

    /// File extension (default: the engine's extension).
    pub extension: Option<String>,
}
