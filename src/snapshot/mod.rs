//! Configuration snapshots and their lifecycle.
//!
//! # Data Flow
//! ```text
//! ResourceSelector (original / last-good / defaults)
//!     → manager.rs perform_load (exists? → loader.parse → Snapshot)
//!     → retrieve_latest: only when the original is newer than the last
//!       snapshot returned AND not the modification time that last failed
//!     → caller applies the snapshot
//!     → accept_latest: original bytes copied over last-good
//! ```
//!
//! # Design Decisions
//! - Three tiers of degradation: live original, last-good copy, defaults
//! - Snapshots are immutable and superseded, never edited
//! - Polling errors are logged and reported as "no update"; only a changed
//!   resource that fails to load is surfaced to the caller

pub mod manager;

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use url::Url;

use crate::error::ConfigResult;
use crate::source::ConfigurationSource;

pub use manager::{ResourceSnapshotManager, ResourceSnapshotManagerBuilder};

/// Immutable, timestamped configuration state loaded from one resource.
#[derive(Clone)]
pub struct Snapshot {
    source: Arc<dyn ConfigurationSource>,
    timestamp: SystemTime,
    origin: Url,
}

impl Snapshot {
    pub fn new(source: Arc<dyn ConfigurationSource>, timestamp: SystemTime, origin: Url) -> Self {
        Self {
            source,
            timestamp,
            origin,
        }
    }

    pub fn source(&self) -> &dyn ConfigurationSource {
        self.source.as_ref()
    }

    /// Shared handle to the source, for identity comparisons.
    pub fn source_arc(&self) -> &Arc<dyn ConfigurationSource> {
        &self.source
    }

    /// Modification time of the resource when it was loaded.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// URI of the resource this snapshot was loaded from.
    pub fn origin(&self) -> &Url {
        &self.origin
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("origin", &self.origin.as_str())
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

/// Source of snapshots for a configuration service.
///
/// `retrieve_latest` and `accept_latest` are driven from a single refresh
/// thread; implementations do not need internal synchronization.
pub trait SnapshotManager: Send + fmt::Debug {
    /// Snapshot loaded once from the defaults resource, if there is one.
    fn retrieve_defaults(&self) -> Option<Snapshot>;

    /// Load the last-good copy and make it the reference point for
    /// subsequent `retrieve_latest` calls.
    fn retrieve_last_good(&mut self) -> ConfigResult<Option<Snapshot>>;

    /// A newly loaded snapshot of the original, or `None` when there is no
    /// usable update.
    fn retrieve_latest(&mut self) -> ConfigResult<Option<Snapshot>>;

    /// Persist the original as the new last-good copy. Best effort.
    fn accept_latest(&mut self);
}
