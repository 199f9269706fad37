//! Shared utilities for integration tests.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use livecfg::loader::TomlLoader;
use livecfg::resource::{FixedResourceSelector, Resource};
use livecfg::snapshot::ResourceSnapshotManager;
use tempfile::TempDir;

/// Write `content` and stamp the file with a fixed modification time.
pub fn write_at(path: &Path, content: &str, secs: u64) {
    fs::write(path, content).unwrap();
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
}

/// A temporary directory holding one TOML original resource.
pub struct Workspace {
    pub dir: TempDir,
    pub original: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("app.toml");
        Self { dir, original }
    }

    #[allow(dead_code)]
    pub fn last_good(&self) -> PathBuf {
        self.dir.path().join("app.last-good.toml")
    }

    /// Manager over the original, with optional bundled defaults.
    pub fn manager(&self, defaults: Option<&str>) -> ResourceSnapshotManager {
        let mut selector = FixedResourceSelector::new(&self.original);
        if let Some(defaults) = defaults {
            selector = selector.with_defaults(Resource::bundled("app.toml", defaults.as_bytes().to_vec()));
        }
        ResourceSnapshotManager::new(selector, Arc::new(TomlLoader)).unwrap()
    }
}
