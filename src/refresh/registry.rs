//! Registered groups.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::binding::ValueDefinitionGroup;
use crate::error::ConfigResult;
use crate::observability::metrics;
use crate::refresh::{apply_group, GroupReport, RefreshPhase};
use crate::source::ConfigurationSource;

/// Identifies a registration; returned by `bind`, consumed by `remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupHandle(u64);

/// Groups tracked for refresh, keyed by registration.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: DashMap<GroupHandle, Arc<ValueDefinitionGroup>>,
    next_id: AtomicU64,
}

/// Reports of one refresh pass over the registry.
#[derive(Debug, Default)]
pub struct RefreshSummary {
    pub groups: Vec<GroupReport>,
}

impl RefreshSummary {
    pub fn values_changed(&self) -> usize {
        self.groups.iter().map(|g| g.changed.len()).sum()
    }

    pub fn groups_changed(&self) -> usize {
        self.groups.iter().filter(|g| g.is_changed()).count()
    }

    pub fn values_retained(&self) -> usize {
        self.groups.iter().map(|g| g.retained.len()).sum()
    }
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `group` against `source` and start tracking it. Nothing is
    /// tracked when a required value does not resolve.
    pub fn bind(
        &self,
        group: Arc<ValueDefinitionGroup>,
        source: &dyn ConfigurationSource,
    ) -> ConfigResult<(GroupHandle, GroupReport)> {
        let report = apply_group(&group, source, RefreshPhase::Initial)?;
        let handle = GroupHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(
            group = %group.name(),
            values = group.values().len(),
            once_only = group.is_once_only(),
            "Group registered"
        );
        self.groups.insert(handle, group);
        metrics::record_registered_groups(self.groups.len());
        Ok((handle, report))
    }

    pub fn remove(&self, handle: GroupHandle) -> Option<Arc<ValueDefinitionGroup>> {
        let removed = self.groups.remove(&handle).map(|(_, group)| group);
        if let Some(group) = &removed {
            tracing::debug!(group = %group.name(), "Group deregistered");
            metrics::record_registered_groups(self.groups.len());
        }
        removed
    }

    pub fn get(&self, handle: GroupHandle) -> Option<Arc<ValueDefinitionGroup>> {
        self.groups.get(&handle).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Apply `source` to every refreshable group, in registration order.
    pub fn refresh(&self, source: &dyn ConfigurationSource) -> RefreshSummary {
        // Snapshot the membership first so listeners may (de)register freely.
        let mut groups: Vec<(GroupHandle, Arc<ValueDefinitionGroup>)> = self
            .groups
            .iter()
            .filter(|entry| !entry.value().is_once_only())
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        groups.sort_by_key(|(handle, _)| *handle);

        let mut summary = RefreshSummary::default();
        for (_, group) in groups {
            match apply_group(&group, source, RefreshPhase::Refresh) {
                Ok(report) => summary.groups.push(report),
                Err(e) => {
                    tracing::error!(group = %group.name(), error = %e, "Group refresh failed");
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ValueDefinition;
    use crate::source::TreeSource;
    use crate::value::Value;

    fn source(text: &str) -> TreeSource {
        TreeSource::new(Value::from(toml::from_str::<toml::Value>(text).unwrap()))
    }

    fn group(name: &str, path: &str) -> Arc<ValueDefinitionGroup> {
        Arc::new(
            ValueDefinitionGroup::builder(name)
                .value(ValueDefinition::<u32>::required(path))
                .build(),
        )
    }

    #[test]
    fn test_failed_bind_is_not_tracked() {
        let registry = GroupRegistry::new();
        assert!(registry.bind(group("g", "missing"), &source("a = 1")).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_refresh_in_registration_order_and_deregister() {
        let registry = GroupRegistry::new();
        let s = source("a = 1\nb = 1");
        let (first, _) = registry.bind(group("first", "a"), &s).unwrap();
        let (second, _) = registry.bind(group("second", "b"), &s).unwrap();
        assert!(first < second);

        let summary = registry.refresh(&source("a = 2\nb = 2"));
        let names: Vec<&str> = summary.groups.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(summary.values_changed(), 2);

        assert_eq!(registry.remove(first).map(|g| g.name().to_string()).as_deref(), Some("first"));
        assert!(registry.remove(first).is_none());
        let summary = registry.refresh(&source("a = 3\nb = 3"));
        assert_eq!(summary.groups.len(), 1);
        assert_eq!(summary.groups_changed(), 1);
    }

    #[test]
    fn test_once_only_groups_are_not_refreshed() {
        let registry = GroupRegistry::new();
        let port = Arc::new(ValueDefinition::<u32>::required("port"));
        let once = Arc::new(
            ValueDefinitionGroup::builder("listener")
                .shared(port.clone())
                .once_only()
                .build(),
        );
        let (handle, report) = registry.bind(once, &source("port = 80")).unwrap();
        assert_eq!(report.changed, vec!["port"]);
        assert!(registry.get(handle).is_some());

        let summary = registry.refresh(&source("port = 8080"));
        assert!(summary.groups.is_empty());
        assert_eq!(port.value(), Some(80));
    }
}
