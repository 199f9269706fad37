//! Snapshot manager backed by [`Resource`] handles.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::{ConfigResult, ConfigurationError};
use crate::loader::{ConfigurationSourceLoader, Encoding};
use crate::resource::{Resource, ResourceSelector};
use crate::snapshot::{Snapshot, SnapshotManager};

/// Polls the original resource and falls back to last-good and defaults.
#[derive(Debug)]
pub struct ResourceSnapshotManager {
    selector: Box<dyn ResourceSelector>,
    loader: Arc<dyn ConfigurationSourceLoader>,
    encoding: Option<Encoding>,
    defaults: Option<Snapshot>,
    /// Timestamp of the last snapshot handed out by `retrieve_latest`
    /// (or loaded by `retrieve_last_good`).
    latest: Option<SystemTime>,
    /// Modification time of the original at the last load attempt.
    last_attempt: Option<SystemTime>,
}

/// Builder for [`ResourceSnapshotManager`].
#[derive(Debug)]
pub struct ResourceSnapshotManagerBuilder {
    selector: Box<dyn ResourceSelector>,
    loader: Arc<dyn ConfigurationSourceLoader>,
    encoding: Option<Encoding>,
    defaults_encoding: Option<Encoding>,
}

impl ResourceSnapshotManagerBuilder {
    /// Encoding override for the original and last-good resources.
    pub fn encoding(mut self, encoding: Option<Encoding>) -> Self {
        self.encoding = encoding;
        self
    }

    /// Encoding override for the defaults resource.
    pub fn defaults_encoding(mut self, encoding: Option<Encoding>) -> Self {
        self.defaults_encoding = encoding;
        self
    }

    /// Loads the defaults. A defaults resource that exists but fails to
    /// load is fatal.
    pub fn build(self) -> ConfigResult<ResourceSnapshotManager> {
        let defaults = match self.selector.defaults() {
            Some(resource) => perform_load(self.loader.as_ref(), resource, self.defaults_encoding)?,
            None => None,
        };
        if let Some(snapshot) = &defaults {
            tracing::info!(origin = %snapshot.origin(), "Defaults loaded");
        }
        Ok(ResourceSnapshotManager {
            selector: self.selector,
            loader: self.loader,
            encoding: self.encoding,
            defaults,
            latest: None,
            last_attempt: None,
        })
    }
}

impl ResourceSnapshotManager {
    pub fn builder(
        selector: impl ResourceSelector + 'static,
        loader: Arc<dyn ConfigurationSourceLoader>,
    ) -> ResourceSnapshotManagerBuilder {
        ResourceSnapshotManagerBuilder {
            selector: Box::new(selector),
            loader,
            encoding: None,
            defaults_encoding: None,
        }
    }

    /// Manager with loader-default encodings.
    pub fn new(
        selector: impl ResourceSelector + 'static,
        loader: Arc<dyn ConfigurationSourceLoader>,
    ) -> ConfigResult<Self> {
        Self::builder(selector, loader).build()
    }

    pub fn selector(&self) -> &dyn ResourceSelector {
        self.selector.as_ref()
    }

    /// Load `resource` into a snapshot; `Ok(None)` if it does not exist.
    pub fn perform_load(&self, resource: &Resource) -> ConfigResult<Option<Snapshot>> {
        perform_load(self.loader.as_ref(), resource, self.encoding)
    }
}

/// Failures are wrapped with the identity of the resource.
fn perform_load(
    loader: &dyn ConfigurationSourceLoader,
    resource: &Resource,
    encoding: Option<Encoding>,
) -> ConfigResult<Option<Snapshot>> {
    if !resource.exists() || !resource.is_readable() {
        return Ok(None);
    }
    let load = || -> ConfigResult<Snapshot> {
        let timestamp = resource.last_modified()?;
        let mut reader = resource.open()?;
        let source = loader.parse(&mut reader, encoding)?;
        Ok(Snapshot::new(source, timestamp, resource.uri()?))
    };
    load()
        .map(Some)
        .map_err(|e| ConfigurationError::for_resource(resource, e))
}

impl SnapshotManager for ResourceSnapshotManager {
    fn retrieve_defaults(&self) -> Option<Snapshot> {
        self.defaults.clone()
    }

    fn retrieve_last_good(&mut self) -> ConfigResult<Option<Snapshot>> {
        let snapshot = self.perform_load(self.selector.last_good())?;
        self.latest = snapshot.as_ref().map(Snapshot::timestamp);
        Ok(snapshot)
    }

    fn retrieve_latest(&mut self) -> ConfigResult<Option<Snapshot>> {
        let original = self.selector.original();
        let modified = match original.last_modified() {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!(
                    resource = %original,
                    error = %e,
                    "Failed to determine last modified for resource"
                );
                return Ok(None);
            }
        };

        let stale = self.latest.is_some_and(|latest| modified <= latest);
        if stale || self.last_attempt == Some(modified) {
            tracing::debug!(resource = %original, "No configuration update");
            return Ok(None);
        }

        self.last_attempt = Some(modified);
        let snapshot = perform_load(self.loader.as_ref(), original, self.encoding)?;
        if let Some(snapshot) = &snapshot {
            self.latest = Some(snapshot.timestamp());
        }
        Ok(snapshot)
    }

    fn accept_latest(&mut self) {
        let original = self.selector.original();
        let last_good = self.selector.last_good();
        let Some(target) = last_good.path() else {
            tracing::debug!(last_good = %last_good, "Last-good resource is not a file, nothing persisted");
            return;
        };
        if let Err(e) = copy_resource(original, target) {
            tracing::warn!(
                original = %original,
                last_good = %last_good,
                error = %e,
                "Failed to copy original resource to last-good"
            );
        }
    }
}

/// Copy through a temporary sibling, then stamp the copy with the
/// original's modification time so it never looks newer than its source.
fn copy_resource(original: &Resource, target: &Path) -> io::Result<()> {
    let modified = original.last_modified()?;
    let mut reader = original.open()?;
    let staging = staging_path(target);
    {
        let mut file = File::create(&staging)?;
        io::copy(&mut reader, &mut file)?;
        file.sync_all()?;
        if let Err(e) = file.set_modified(modified) {
            tracing::debug!(error = %e, "Could not preserve modification time on last-good copy");
        }
    }
    fs::rename(&staging, target).inspect_err(|_| {
        let _ = fs::remove_file(&staging);
    })
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}
