//! Metrics for snapshot refreshes and change notification.
//!
//! # Metrics
//! - `livecfg_refresh_total` (counter): refresh passes by outcome
//!   (`applied`, `unchanged`, `failed`)
//! - `livecfg_values_changed_total` (counter): definitions whose value changed
//! - `livecfg_resolution_failures_total` (counter): definitions that kept
//!   their previous value because the new snapshot did not resolve, by group
//! - `livecfg_listener_skipped_total` (counter): listeners skipped because
//!   their target was dropped, by kind (`value`, `group`)
//! - `livecfg_registered_groups` (gauge): groups currently registered
//!
//! No exporter is installed here; the embedding application picks one.

use metrics::{counter, gauge};

pub fn record_refresh(outcome: &'static str) {
    counter!("livecfg_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_values_changed(count: usize) {
    if count > 0 {
        counter!("livecfg_values_changed_total").increment(count as u64);
    }
}

pub fn record_resolution_failure(group: &str) {
    counter!("livecfg_resolution_failures_total", "group" => group.to_string()).increment(1);
}

pub fn record_listener_skipped(kind: &'static str) {
    counter!("livecfg_listener_skipped_total", "kind" => kind).increment(1);
}

pub fn record_registered_groups(count: usize) {
    gauge!("livecfg_registered_groups").set(count as f64);
}
