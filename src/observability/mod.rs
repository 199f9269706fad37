//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! snapshot manager, service, refresh engine, reloader produce:
//!     → tracing events (logging.rs installs the subscriber for the CLI)
//!     → metrics.rs counters and gauges
//! ```
//!
//! # Design Decisions
//! - Library code never installs a subscriber or exporter
//! - Metrics are cheap (no-ops until a recorder is installed)

pub mod logging;
pub mod metrics;
