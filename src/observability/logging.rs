//! Structured logging setup for the `livecfg` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! application's call.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directive when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "livecfg=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, or by `verbosity`
/// (`0` = info, `1` = debug, `2+` = trace) when `RUST_LOG` is unset.
pub fn init_tracing(verbosity: u8) {
    let fallback = match verbosity {
        0 => DEFAULT_FILTER.to_string(),
        1 => "livecfg=debug".to_string(),
        _ => "livecfg=trace".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
