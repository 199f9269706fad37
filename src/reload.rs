//! Periodic reloading.
//!
//! # Responsibilities
//! - Enforce a minimum polling interval
//! - Drive `ConfigurationService::refresh` from a single background task
//! - Stop cleanly on shutdown
//!
//! # Design Decisions
//! - Refresh does blocking file I/O and runs listeners, so each pass runs on
//!   the blocking pool; the loop awaits it, so passes never overlap
//! - The first pass happens one period after start; startup already loaded

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::service::{ConfigurationService, RefreshOutcome};

/// Polling more often than this is refused.
pub const MINIMUM_RELOAD_INTERVAL: Duration = Duration::from_millis(500);

/// A validated polling period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadInterval(Duration);

impl ReloadInterval {
    /// `None`, meaning "no periodic reload", below the 500 ms minimum.
    pub fn from_millis(millis: u64) -> Option<Self> {
        Self::new(Duration::from_millis(millis))
    }

    pub fn new(period: Duration) -> Option<Self> {
        if period < MINIMUM_RELOAD_INTERVAL {
            tracing::warn!(
                requested_ms = period.as_millis() as u64,
                minimum_ms = MINIMUM_RELOAD_INTERVAL.as_millis() as u64,
                "Reload interval below minimum, periodic reload disabled"
            );
            return None;
        }
        Some(Self(period))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

/// Background task calling `refresh` every interval.
#[derive(Debug)]
pub struct ConfigurationReloader {
    service: Arc<ConfigurationService>,
    interval: ReloadInterval,
}

impl ConfigurationReloader {
    pub fn new(service: Arc<ConfigurationService>, interval: ReloadInterval) -> Self {
        Self { service, interval }
    }

    /// Spawn onto the current tokio runtime.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let period = self.interval.as_duration();
        tracing::info!(
            service = %self.service.name(),
            interval_ms = period.as_millis() as u64,
            "Configuration reloader starting"
        );

        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.reload_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!(service = %self.service.name(), "Configuration reloader received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn reload_once(&self) {
        let service = self.service.clone();
        match tokio::task::spawn_blocking(move || service.refresh()).await {
            Ok(RefreshOutcome::Unchanged) => {
                tracing::trace!(service = %self.service.name(), "No configuration change");
            }
            // Applied and failed passes are reported by the event handler.
            Ok(_) => {}
            Err(e) => {
                tracing::error!(service = %self.service.name(), error = %e, "Configuration refresh task failed");
            }
        }
    }
}
