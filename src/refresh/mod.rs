//! Change notification engine.
//!
//! # Data Flow
//! ```text
//! new snapshot (layered over defaults)
//!     → registry.rs: every registered, refreshable group
//!     → apply_group: per definition, in registration order
//!         resolve → compare with held value → value listener (weak target)
//!     → group listener, at most once per group per pass
//! ```
//!
//! # Design Decisions
//! - Comparison is against each definition's held value, so replaying the
//!   same snapshot is silent
//! - A group's update runs under its own lock; groups do not wait on each other
//! - Initial bind checks every definition before touching any of them, so a
//!   group that fails to bind has not notified anybody
//! - On refresh a failing definition keeps its old value while the rest of
//!   the group is still applied

pub mod registry;

use crate::binding::{DefinitionUpdate, Delivery, GroupChange, ValueDefinitionGroup};
use crate::error::{ConfigResult, ConfigurationError};
use crate::observability::metrics;
use crate::source::ConfigurationSource;

pub use registry::{GroupHandle, GroupRegistry, RefreshSummary};

/// Which rules govern unresolved required values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    /// First bind at registration; unresolved required values are fatal.
    Initial,
    /// Later snapshots; unresolved values keep their previous value.
    Refresh,
}

/// What one pass did to one group.
#[derive(Debug)]
pub struct GroupReport {
    pub group: String,
    /// Paths whose value changed, in definition order.
    pub changed: Vec<String>,
    /// Definitions that kept their previous value.
    pub retained: Vec<ConfigurationError>,
    /// Whether a group listener was invoked and reached its target.
    pub notified: bool,
}

impl GroupReport {
    fn new(group: &str) -> Self {
        Self {
            group: group.to_string(),
            changed: Vec::new(),
            retained: Vec::new(),
            notified: false,
        }
    }

    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Bring every definition of `group` up to date with `source`.
///
/// Only [`RefreshPhase::Initial`] can fail.
pub fn apply_group(
    group: &ValueDefinitionGroup,
    source: &dyn ConfigurationSource,
    phase: RefreshPhase,
) -> ConfigResult<GroupReport> {
    let _guard = group.lock_updates();

    if phase == RefreshPhase::Initial {
        let failures: Vec<ConfigurationError> = group
            .values()
            .iter()
            .filter_map(|definition| definition.check(source).err())
            .collect();
        if !failures.is_empty() {
            return Err(ConfigurationError::Unresolved {
                group: group.name().to_string(),
                failures,
            });
        }
    }

    let mut report = GroupReport::new(group.name());
    for definition in group.values() {
        match definition.update(source) {
            DefinitionUpdate::Unchanged => {}
            DefinitionUpdate::Changed(delivery) => {
                tracing::debug!(group = %group.name(), path = %definition.path(), "Value changed");
                if delivery == Delivery::TargetDropped {
                    tracing::warn!(
                        group = %group.name(),
                        path = %definition.path(),
                        "Listener target dropped, value change not delivered"
                    );
                    metrics::record_listener_skipped("value");
                }
                report.changed.push(definition.path().to_string());
            }
            DefinitionUpdate::Retained(error) => {
                tracing::warn!(
                    group = %group.name(),
                    path = %definition.path(),
                    error = %error,
                    "Value could not be resolved, keeping previous value"
                );
                metrics::record_resolution_failure(group.name());
                report.retained.push(error);
            }
        }
    }

    if report.is_changed() && group.has_listener() {
        let change = GroupChange {
            group: report.group.clone(),
            changed: report.changed.clone(),
        };
        match group.notify(&change) {
            Delivery::Delivered => report.notified = true,
            Delivery::TargetDropped => {
                tracing::warn!(group = %group.name(), "Group listener target dropped");
                metrics::record_listener_skipped("group");
            }
        }
    }
    metrics::record_values_changed(report.changed.len());

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ValueDefinition;
    use crate::source::TreeSource;
    use crate::value::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn source(text: &str) -> TreeSource {
        TreeSource::new(Value::from(toml::from_str::<toml::Value>(text).unwrap()))
    }

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let c = Arc::new(AtomicUsize::new(0));
        (c.clone(), c)
    }

    fn bump(c: Arc<AtomicUsize>) -> impl Fn(Option<&u32>, Option<&u32>) + Send + Sync + 'static {
        move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_one_change_fires_one_value_listener_and_one_group_listener() {
        let (value_calls, v) = counter();
        let (group_calls, g) = counter();
        let group = ValueDefinitionGroup::builder("pool")
            .value(ValueDefinition::<u32>::required("a").on_change(bump(v.clone())))
            .value(ValueDefinition::<u32>::required("b").on_change(bump(v.clone())))
            .value(ValueDefinition::<u32>::required("c").on_change(bump(v)))
            .on_change(move |_| {
                g.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        apply_group(&group, &source("a = 1\nb = 2\nc = 3"), RefreshPhase::Initial).unwrap();
        assert_eq!(value_calls.load(Ordering::SeqCst), 3);
        assert_eq!(group_calls.load(Ordering::SeqCst), 1);

        let report = apply_group(&group, &source("a = 1\nb = 20\nc = 3"), RefreshPhase::Refresh).unwrap();
        assert_eq!(report.changed, vec!["b"]);
        assert!(report.notified);
        assert_eq!(value_calls.load(Ordering::SeqCst), 4);
        assert_eq!(group_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_replaying_same_source_is_silent() {
        let (group_calls, g) = counter();
        let group = ValueDefinitionGroup::builder("g")
            .value(ValueDefinition::<String>::required("name"))
            .on_change(move |_| {
                g.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        let s = source("name = \"svc\"");

        apply_group(&group, &s, RefreshPhase::Initial).unwrap();
        let report = apply_group(&group, &s, RefreshPhase::Refresh).unwrap();
        assert!(!report.is_changed());
        assert!(!report.notified);
        assert_eq!(group_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_replaying_nan_value_is_silent() {
        let (value_calls, v) = counter();
        let group = ValueDefinitionGroup::builder("g")
            .value(ValueDefinition::<f64>::required("ratio").on_change(move |_, _| {
                v.fetch_add(1, Ordering::SeqCst);
            }))
            .value(ValueDefinition::<Value>::required("limits"))
            .build();
        let s = source("ratio = nan\n[limits]\nscale = nan");

        apply_group(&group, &s, RefreshPhase::Initial).unwrap();
        let report = apply_group(&group, &s, RefreshPhase::Refresh).unwrap();
        assert!(!report.is_changed());
        assert_eq!(value_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_initial_failure_notifies_nobody() {
        let (value_calls, v) = counter();
        let group = ValueDefinitionGroup::builder("db")
            .value(ValueDefinition::<String>::required("db.url").on_change(move |_, _| {
                v.fetch_add(1, Ordering::SeqCst);
            }))
            .value(ValueDefinition::<u32>::required("db.pool"))
            .value(ValueDefinition::<u32>::required("db.timeout"))
            .build();

        let err = apply_group(
            &group,
            &source("[db]\nurl = \"x\"\ntimeout = \"slow\""),
            RefreshPhase::Initial,
        )
        .unwrap_err();

        match err {
            ConfigurationError::Unresolved { group, failures } => {
                assert_eq!(group, "db");
                assert_eq!(failures.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(value_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_refresh_failure_keeps_old_value_and_applies_rest() {
        let port = Arc::new(ValueDefinition::<u16>::required("port"));
        let host = Arc::new(ValueDefinition::<String>::required("host"));
        let group = ValueDefinitionGroup::builder("http")
            .shared(port.clone())
            .shared(host.clone())
            .build();

        apply_group(&group, &source("port = 80\nhost = \"a\""), RefreshPhase::Initial).unwrap();
        let report =
            apply_group(&group, &source("port = \"eighty\"\nhost = \"b\""), RefreshPhase::Refresh).unwrap();

        assert_eq!(report.retained.len(), 1);
        assert_eq!(report.changed, vec!["host"]);
        assert_eq!(port.value(), Some(80));
        assert_eq!(host.value().as_deref(), Some("b"));
    }

    #[test]
    fn test_dropped_target_does_not_affect_other_listeners() {
        struct Target;
        let gone = Arc::new(Target);
        let (live_calls, l) = counter();
        let group = ValueDefinitionGroup::builder("g")
            .value(ValueDefinition::<u32>::required("a").bind(&gone, |_, _, _| {}))
            .value(ValueDefinition::<u32>::required("b").on_change(move |_, _| {
                l.fetch_add(1, Ordering::SeqCst);
            }))
            .build();
        apply_group(&group, &source("a = 1\nb = 1"), RefreshPhase::Initial).unwrap();
        drop(gone);

        let report = apply_group(&group, &source("a = 2\nb = 2"), RefreshPhase::Refresh).unwrap();
        assert_eq!(report.changed, vec!["a", "b"]);
        assert_eq!(live_calls.load(Ordering::SeqCst), 2);
    }
}
