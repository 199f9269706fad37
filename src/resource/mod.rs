//! Resource handles and the selection of original / last-good / defaults.
//!
//! # Data Flow
//! ```text
//! settings (fixed path | base directories + naming)
//!     → location.rs (placeholder expansion, base directory resolution)
//!     → naming.rs (candidate file names, most specific first)
//!     → scanning.rs / FixedResourceSelector (resolved ONCE at construction)
//!     → original, last-good and defaults handles for the snapshot manager
//! ```
//!
//! # Design Decisions
//! - A handle does not guarantee existence; the manager checks on every use
//! - Resolution is not repeated per poll, so a moved original is not
//!   rediscovered until the process restarts
//! - The last-good copy always lives next to the original it mirrors

pub mod location;
pub mod naming;
pub mod scanning;

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

use crate::error::{ConfigResult, ConfigurationError};

pub use location::{BaseDirectory, Environment, PlatformDirectory};
pub use naming::{
    ApplicationVersion, BasicResourceNameResolver, ResourceNameResolver,
    VersionedResourceNameResolver,
};
pub use scanning::ScanningResourceSelector;

/// Marker inserted before the extension of a last-good copy.
pub const LAST_GOOD_MARKER: &str = "last-good";

/// A location configuration bytes can be read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// A file on the local filesystem.
    File(PathBuf),
    /// Content compiled into the application, typically defaults.
    Bundled { name: String, content: Arc<[u8]> },
}

impl Resource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Resource::File(path.into())
    }

    pub fn bundled(name: impl Into<String>, content: impl Into<Arc<[u8]>>) -> Self {
        Resource::Bundled {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Filesystem path, for file resources.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resource::File(path) => Some(path),
            Resource::Bundled { .. } => None,
        }
    }

    pub fn exists(&self) -> bool {
        match self {
            Resource::File(path) => path.is_file(),
            Resource::Bundled { .. } => true,
        }
    }

    pub fn is_readable(&self) -> bool {
        match self {
            Resource::File(path) => File::open(path).is_ok(),
            Resource::Bundled { .. } => true,
        }
    }

    /// Modification time. Bundled content is as old as it gets.
    pub fn last_modified(&self) -> io::Result<SystemTime> {
        match self {
            Resource::File(path) => fs::metadata(path)?.modified(),
            Resource::Bundled { .. } => Ok(UNIX_EPOCH),
        }
    }

    pub fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        match self {
            Resource::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            Resource::Bundled { content, .. } => Ok(Box::new(&content[..])),
        }
    }

    /// Identity of this resource as a URI.
    pub fn uri(&self) -> ConfigResult<Url> {
        match self {
            Resource::File(path) => {
                let absolute = std::path::absolute(path)?;
                Url::from_file_path(&absolute)
                    .map_err(|_| ConfigurationError::InvalidUri(absolute.display().to_string()))
            }
            Resource::Bundled { name, .. } => Url::parse(&format!("bundled:{}", name))
                .map_err(|_| ConfigurationError::InvalidUri(format!("bundled:{}", name))),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::File(path) => write!(f, "{}", path.display()),
            Resource::Bundled { name, .. } => write!(f, "bundled:{}", name),
        }
    }
}

/// Where the snapshot manager reads from.
pub trait ResourceSelector: Send + Sync + fmt::Debug {
    /// The live resource, which may change while the process runs.
    fn original(&self) -> &Resource;

    /// Copy of the original as it was when last successfully applied.
    fn last_good(&self) -> &Resource;

    /// Baseline configuration, if the application ships one.
    fn defaults(&self) -> Option<&Resource>;
}

/// `app.toml` → `app.last-good.toml`, `app` → `app.last-good`.
pub fn last_good_path(original: &Path) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match original.extension() {
        Some(ext) => format!("{}.{}.{}", stem, LAST_GOOD_MARKER, ext.to_string_lossy()),
        None => format!("{}.{}", stem, LAST_GOOD_MARKER),
    };
    original.with_file_name(name)
}

/// Selector for an explicitly configured original path.
#[derive(Debug, Clone)]
pub struct FixedResourceSelector {
    original: Resource,
    last_good: Resource,
    defaults: Option<Resource>,
}

impl FixedResourceSelector {
    pub fn new(original: impl Into<PathBuf>) -> Self {
        let original = original.into();
        let last_good = last_good_path(&original);
        Self {
            original: Resource::File(original),
            last_good: Resource::File(last_good),
            defaults: None,
        }
    }

    pub fn with_last_good(mut self, path: impl Into<PathBuf>) -> Self {
        self.last_good = Resource::File(path.into());
        self
    }

    pub fn with_defaults(mut self, defaults: Resource) -> Self {
        self.defaults = Some(defaults);
        self
    }
}

impl ResourceSelector for FixedResourceSelector {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_good_path_keeps_extension() {
        assert_eq!(
            last_good_path(Path::new("/etc/app/app.toml")),
            PathBuf::from("/etc/app/app.last-good.toml")
        );
        assert_eq!(
            last_good_path(Path::new("conf/app")),
            PathBuf::from("conf/app.last-good")
        );
    }

    #[test]
    fn test_fixed_selector_locations() {
        let selector = FixedResourceSelector::new("/srv/app.properties")
            .with_defaults(Resource::bundled("app.properties", b"a=1".to_vec()));
        assert_eq!(selector.original().path(), Some(Path::new("/srv/app.properties")));
        assert_eq!(
            selector.last_good().path(),
            Some(Path::new("/srv/app.last-good.properties"))
        );
        assert!(selector.defaults().is_some());
    }

    #[test]
    fn test_bundled_resource_is_always_readable() {
        let resource = Resource::bundled("defaults.toml", b"timeout = 30".to_vec());
        assert!(resource.exists());
        assert!(resource.is_readable());
        assert_eq!(resource.last_modified().unwrap(), UNIX_EPOCH);
        assert_eq!(resource.uri().unwrap().as_str(), "bundled:defaults.toml");

        let mut text = String::new();
        resource.open().unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "timeout = 30");
    }

    #[test]
    fn test_missing_file_resource() {
        let dir = tempfile::tempdir().unwrap();
        let resource = Resource::file(dir.path().join("absent.toml"));
        assert!(!resource.exists());
        assert!(!resource.is_readable());
        assert!(resource.last_modified().is_err());
        assert_eq!(resource.uri().unwrap().scheme(), "file");
    }
}
