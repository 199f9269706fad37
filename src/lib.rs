//! Live configuration snapshots with fallback and change notification.
//!
//! # Architecture Overview
//!
//! ```text
//!   settings ──▶ assemble ──▶ ResourceSelector ──▶ ResourceSnapshotManager
//!                                (original / last-good / defaults)     │
//!                                                                      ▼
//!   consumers ◀── listeners ◀── GroupRegistry ◀── ConfigurationService (ArcSwap current)
//!                                                                      ▲
//!                                              ConfigurationReloader ──┘ (periodic refresh)
//! ```

pub mod binding;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod observability;
pub mod refresh;
pub mod reload;
pub mod resource;
pub mod service;
pub mod settings;
pub mod snapshot;
pub mod source;
pub mod value;

pub use binding::{GroupChange, ValueDefinition, ValueDefinitionGroup};
pub use engine::Engine;
pub use error::{ConfigResult, ConfigurationError};
pub use lifecycle::Shutdown;
pub use refresh::GroupHandle;
pub use reload::{ConfigurationReloader, ReloadInterval};
pub use service::{ConfigurationService, RefreshOutcome};
pub use snapshot::{Snapshot, SnapshotManager};
pub use source::ConfigurationSource;
pub use value::{FromValue, Value};
