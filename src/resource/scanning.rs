//! Selector that searches an ordered list of base directories.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{ConfigResult, ConfigurationError};
use crate::resource::{
    last_good_path, BaseDirectory, Environment, Resource, ResourceNameResolver, ResourceSelector,
};

/// Picks the first base directory holding a readable resource under any
/// candidate name. Falls back to the preferred name inside the first
/// existing directory, so a resource created there later is still found.
#[derive(Debug, Clone)]
pub struct ScanningResourceSelector {
    directory: PathBuf,
    original: Resource,
    last_good: Resource,
    defaults: Option<Resource>,
}

impl ScanningResourceSelector {
    pub fn new(
        base_directories: &[BaseDirectory],
        naming: &dyn ResourceNameResolver,
        env: &Environment,
        app_name: &str,
    ) -> ConfigResult<Self> {
        let names = naming.names();
        let mut existing = Vec::new();
        let mut tried = Vec::new();

        for base in base_directories {
            let Some(dir) = base.resolve(env, app_name)? else {
                tracing::debug!(base = ?base, "Base directory not applicable");
                continue;
            };
            if !dir.is_dir() {
                tracing::debug!(dir = %dir.display(), "Base directory does not exist");
                tried.push(dir.display().to_string());
                continue;
            }
            if let Some(found) = find_readable(&dir, &names) {
                tracing::info!(resource = %found.display(), "Configuration resource selected");
                return Ok(Self::at(dir, found));
            }
            existing.push(dir);
        }

        match (existing.into_iter().next(), names.first()) {
            (Some(dir), Some(preferred)) => {
                let original = dir.join(preferred);
                tracing::warn!(
                    resource = %original.display(),
                    "No configuration resource found, expecting one at the preferred location"
                );
                Ok(Self::at(dir, original))
            }
            _ => Err(ConfigurationError::NoBaseDirectory(tried.join(", "))),
        }
    }

    fn at(directory: PathBuf, original: PathBuf) -> Self {
        let last_good = last_good_path(&original);
        Self {
            directory,
            original: Resource::File(original),
            last_good: Resource::File(last_good),
            defaults: None,
        }
    }

    pub fn with_defaults(mut self, defaults: Resource) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// The base directory that was selected.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

fn find_readable(dir: &Path, names: &[String]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file() && File::open(candidate).is_ok())
}

impl ResourceSelector for ScanningResourceSelector {
    fn original(&self) -> &Resource {
        &self.original
    }

    fn last_good(&self) -> &Resource {
        &self.last_good
    }

    fn defaults(&self) -> Option<&Resource> {
        self.defaults.as_ref()
    }
}
