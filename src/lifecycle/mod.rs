//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     settings → assemble → ConfigurationService (init) → reloader spawned
//!
//! Shutdown (shutdown.rs):
//!     Ctrl-C / owner drop → Shutdown::trigger → reloader loop exits
//! ```
//!
//! # Design Decisions
//! - A refresh already running when shutdown arrives finishes on its
//!   blocking thread; the published snapshot is never left half-applied

pub mod shutdown;

pub use shutdown::Shutdown;
