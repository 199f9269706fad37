//! Configuration service.
//!
//! # Responsibilities
//! - Choose the starting snapshot (latest, then last-good, then defaults)
//! - Publish the current snapshot atomically for concurrent readers
//! - Bind groups on registration and re-apply them on every new snapshot
//! - Resolve one-off values against the current snapshot over the defaults
//!
//! # Design Decisions
//! - Readers never lock: `current` is an `ArcSwapOption`
//! - The manager mutex serializes refreshes; a refresh publishes, notifies,
//!   then persists the original as last-good
//! - A snapshot that left any value unresolved is still published but is not
//!   persisted as last-good
//! - Listeners must not call `refresh` re-entrantly

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwapOption;

use crate::binding::ValueDefinitionGroup;
use crate::error::{ConfigResult, ConfigurationError};
use crate::observability::metrics;
use crate::refresh::{apply_group, GroupHandle, GroupRegistry, RefreshPhase, RefreshSummary};
use crate::snapshot::{Snapshot, SnapshotManager};
use crate::source::{ConfigurationSource, LayeredSource};
use crate::value::FromValue;

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotTier {
    Latest,
    LastGood,
    Defaults,
}

impl fmt::Display for SnapshotTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SnapshotTier::Latest => "latest",
            SnapshotTier::LastGood => "last-good",
            SnapshotTier::Defaults => "defaults",
        })
    }
}

/// Hook for snapshot lifecycle events.
pub trait SnapshotEventHandler: Send + Sync + fmt::Debug {
    /// A snapshot became current at startup.
    fn initialized(&self, _snapshot: Option<&Snapshot>, _tier: SnapshotTier) {}

    /// A newer snapshot was published and groups were notified.
    fn applied(&self, _snapshot: &Snapshot, _summary: &RefreshSummary) {}

    /// A changed resource failed to load; the previous snapshot stays current.
    fn failed(&self, _error: &ConfigurationError) {}
}

/// Default handler; reports events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSnapshotEventHandler;

impl SnapshotEventHandler for LoggingSnapshotEventHandler {
    fn initialized(&self, snapshot: Option<&Snapshot>, tier: SnapshotTier) {
        match snapshot {
            Some(snapshot) => tracing::info!(origin = %snapshot.origin(), tier = %tier, "Configuration initialized"),
            None => tracing::info!(tier = %tier, "Configuration initialized"),
        }
    }

    fn applied(&self, snapshot: &Snapshot, summary: &RefreshSummary) {
        tracing::info!(
            origin = %snapshot.origin(),
            groups_changed = summary.groups_changed(),
            values_changed = summary.values_changed(),
            values_retained = summary.values_retained(),
            "Configuration snapshot applied"
        );
    }

    fn failed(&self, error: &ConfigurationError) {
        tracing::error!(error = %error, "Configuration snapshot failed to load, keeping current");
    }
}

/// Result of one [`ConfigurationService::refresh`].
#[derive(Debug)]
pub enum RefreshOutcome {
    /// No newer usable snapshot.
    Unchanged,
    Applied(RefreshSummary),
    Failed(ConfigurationError),
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied(_))
    }

    fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Unchanged => "unchanged",
            RefreshOutcome::Applied(_) => "applied",
            RefreshOutcome::Failed(_) => "failed",
        }
    }
}

/// Owns the current snapshot and the registered groups.
pub struct ConfigurationService {
    name: String,
    manager: Mutex<Box<dyn SnapshotManager>>,
    current: ArcSwapOption<Snapshot>,
    defaults: Option<Snapshot>,
    registry: GroupRegistry,
    events: Arc<dyn SnapshotEventHandler>,
}

impl ConfigurationService {
    /// Initialize from `manager`, logging events through `tracing`.
    pub fn new(name: impl Into<String>, manager: impl SnapshotManager + 'static) -> ConfigResult<Self> {
        Self::with_event_handler(name, manager, Arc::new(LoggingSnapshotEventHandler))
    }

    /// Fails when neither latest, last-good nor defaults yield a snapshot.
    pub fn with_event_handler(
        name: impl Into<String>,
        manager: impl SnapshotManager + 'static,
        events: Arc<dyn SnapshotEventHandler>,
    ) -> ConfigResult<Self> {
        let defaults = manager.retrieve_defaults();
        let service = Self {
            name: name.into(),
            manager: Mutex::new(Box::new(manager)),
            current: ArcSwapOption::empty(),
            defaults,
            registry: GroupRegistry::new(),
            events,
        };
        service.init()?;
        Ok(service)
    }

    fn init(&self) -> ConfigResult<()> {
        let mut manager = self.lock_manager();

        let latest = manager.retrieve_latest().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Latest configuration failed to load, trying last-good");
            self.events.failed(&e);
            None
        });
        if let Some(snapshot) = latest {
            self.events.initialized(Some(&snapshot), SnapshotTier::Latest);
            self.current.store(Some(Arc::new(snapshot)));
            manager.accept_latest();
            return Ok(());
        }

        match manager.retrieve_last_good() {
            Ok(Some(snapshot)) => {
                self.events.initialized(Some(&snapshot), SnapshotTier::LastGood);
                self.current.store(Some(Arc::new(snapshot)));
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Last-good configuration failed to load");
                self.events.failed(&e);
            }
        }

        if self.defaults.is_some() {
            self.events.initialized(self.defaults.as_ref(), SnapshotTier::Defaults);
            return Ok(());
        }
        Err(ConfigurationError::NoConfiguration(self.name.clone()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The published snapshot; `None` while running on defaults alone.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    pub fn defaults(&self) -> Option<&Snapshot> {
        self.defaults.as_ref()
    }

    /// Resolve `path` now against the current snapshot, then the defaults.
    pub fn resolve<T: FromValue>(&self, path: &str) -> ConfigResult<T> {
        let current = self.current();
        let source = self.layered(current.as_deref());
        (&source as &dyn ConfigurationSource).retrieve(path)
    }

    pub fn resolve_optional<T: FromValue>(&self, path: &str) -> ConfigResult<Option<T>> {
        let current = self.current();
        let source = self.layered(current.as_deref());
        (&source as &dyn ConfigurationSource).retrieve_optional(path)
    }

    /// Every path resolvable right now.
    pub fn paths(&self) -> Vec<String> {
        let current = self.current();
        self.layered(current.as_deref()).paths()
    }

    /// Bind `group` to the current configuration and track it for refresh.
    ///
    /// Fails, tracking nothing, when a required value does not resolve.
    pub fn register(&self, group: ValueDefinitionGroup) -> ConfigResult<GroupHandle> {
        let group = Arc::new(group);
        let bound_with = self.current();
        let (handle, _) = self
            .registry
            .bind(group.clone(), &self.layered(bound_with.as_deref()))?;

        // A refresh may have published between binding and tracking.
        let latest = self.current();
        if !group.is_once_only() && !same_snapshot(&bound_with, &latest) {
            apply_group(&group, &self.layered(latest.as_deref()), RefreshPhase::Refresh)?;
        }
        Ok(handle)
    }

    /// Stop tracking a group. Returns whether it was registered.
    pub fn deregister(&self, handle: GroupHandle) -> bool {
        self.registry.remove(handle).is_some()
    }

    pub fn registered_groups(&self) -> usize {
        self.registry.len()
    }

    /// Publish a newer snapshot if there is one, notify groups, then
    /// persist it as last-good unless some value kept its previous value.
    pub fn refresh(&self) -> RefreshOutcome {
        let mut manager = self.lock_manager();
        let outcome = match manager.retrieve_latest() {
            Ok(None) => RefreshOutcome::Unchanged,
            Ok(Some(snapshot)) => {
                let snapshot = Arc::new(snapshot);
                self.current.store(Some(snapshot.clone()));
                let summary = self.registry.refresh(&self.layered(Some(snapshot.as_ref())));
                if summary.values_retained() == 0 {
                    manager.accept_latest();
                } else {
                    tracing::warn!(
                        service = %self.name,
                        origin = %snapshot.origin(),
                        retained = summary.values_retained(),
                        "Snapshot left values unresolved, last-good not updated"
                    );
                }
                self.events.applied(&snapshot, &summary);
                RefreshOutcome::Applied(summary)
            }
            Err(e) => {
                self.events.failed(&e);
                RefreshOutcome::Failed(e)
            }
        };
        metrics::record_refresh(outcome.label());
        outcome
    }

    fn layered<'a>(&'a self, current: Option<&'a Snapshot>) -> LayeredSource<'a> {
        LayeredSource::new(
            current.map(Snapshot::source),
            self.defaults.as_ref().map(Snapshot::source),
        )
    }

    fn lock_manager(&self) -> MutexGuard<'_, Box<dyn SnapshotManager>> {
        self.manager.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn same_snapshot(a: &Option<Arc<Snapshot>>, b: &Option<Arc<Snapshot>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl fmt::Debug for ConfigurationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationService")
            .field("name", &self.name)
            .field("current", &self.current.load().as_deref().map(Snapshot::origin))
            .field("defaults", &self.defaults.as_ref().map(Snapshot::origin))
            .field("groups", &self.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ValueDefinition;
    use crate::source::TreeSource;
    use crate::value::Value;
    use std::collections::VecDeque;
    use std::time::{Duration, UNIX_EPOCH};
    use url::Url;

    /// Manager replaying a scripted sequence of `retrieve_latest` results.
    #[derive(Debug, Default)]
    struct ScriptedManager {
        latest: VecDeque<ConfigResult<Option<Snapshot>>>,
        last_good: Option<Snapshot>,
        defaults: Option<Snapshot>,
        accepted: Arc<Mutex<usize>>,
    }

    impl SnapshotManager for ScriptedManager {
        fn retrieve_defaults(&self) -> Option<Snapshot> {
            self.defaults.clone()
        }

        fn retrieve_last_good(&mut self) -> ConfigResult<Option<Snapshot>> {
            Ok(self.last_good.clone())
        }

        fn retrieve_latest(&mut self) -> ConfigResult<Option<Snapshot>> {
            self.latest.pop_front().unwrap_or(Ok(None))
        }

        fn accept_latest(&mut self) {
            *self.accepted.lock().unwrap() += 1;
        }
    }

    fn snapshot(text: &str, secs: u64) -> Snapshot {
        let source = TreeSource::new(Value::from(toml::from_str::<toml::Value>(text).unwrap()));
        Snapshot::new(
            Arc::new(source),
            UNIX_EPOCH + Duration::from_secs(secs),
            Url::parse("file:///etc/app/app.toml").unwrap(),
        )
    }

    fn parse_error() -> ConfigurationError {
        ConfigurationError::for_resource(
            "/etc/app/app.toml",
            ConfigurationError::Parse {
                format: "TOML",
                message: "bad".into(),
            },
        )
    }

    #[test]
    fn test_init_prefers_latest_and_accepts_it() {
        let accepted = Arc::new(Mutex::new(0));
        let manager = ScriptedManager {
            latest: VecDeque::from([Ok(Some(snapshot("timeout = 60", 2)))]),
            last_good: Some(snapshot("timeout = 45", 1)),
            defaults: Some(snapshot("timeout = 30\nretries = 3", 0)),
            accepted: accepted.clone(),
        };
        let service = ConfigurationService::new("app", manager).unwrap();

        assert_eq!(service.resolve::<u32>("timeout").unwrap(), 60);
        assert_eq!(service.resolve::<u32>("retries").unwrap(), 3);
        assert_eq!(*accepted.lock().unwrap(), 1);
    }

    #[test]
    fn test_init_falls_back_to_last_good_then_defaults() {
        let manager = ScriptedManager {
            latest: VecDeque::from([Err(parse_error())]),
            last_good: Some(snapshot("timeout = 45", 1)),
            ..Default::default()
        };
        let service = ConfigurationService::new("app", manager).unwrap();
        assert_eq!(service.resolve::<u32>("timeout").unwrap(), 45);

        let manager = ScriptedManager {
            defaults: Some(snapshot("timeout = 30", 0)),
            ..Default::default()
        };
        let service = ConfigurationService::new("app", manager).unwrap();
        assert!(service.current().is_none());
        assert_eq!(service.resolve::<u32>("timeout").unwrap(), 30);
    }

    #[test]
    fn test_init_without_any_snapshot_fails() {
        let err = ConfigurationService::new("app", ScriptedManager::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::NoConfiguration(name) if name == "app"));
    }

    #[test]
    fn test_refresh_publishes_notifies_and_accepts() {
        let accepted = Arc::new(Mutex::new(0));
        let manager = ScriptedManager {
            latest: VecDeque::from([
                Ok(Some(snapshot("timeout = 30", 1))),
                Ok(None),
                Err(parse_error()),
                Ok(Some(snapshot("timeout = 60", 3))),
            ]),
            accepted: accepted.clone(),
            ..Default::default()
        };
        let service = ConfigurationService::new("app", manager).unwrap();
        let timeout = Arc::new(ValueDefinition::<u32>::required("timeout"));
        service
            .register(ValueDefinitionGroup::builder("client").shared(timeout.clone()).build())
            .unwrap();
        assert_eq!(timeout.value(), Some(30));

        assert!(matches!(service.refresh(), RefreshOutcome::Unchanged));
        assert!(matches!(service.refresh(), RefreshOutcome::Failed(_)));
        assert_eq!(timeout.value(), Some(30));

        match service.refresh() {
            RefreshOutcome::Applied(summary) => assert_eq!(summary.values_changed(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(timeout.value(), Some(60));
        assert_eq!(*accepted.lock().unwrap(), 2);
    }

    #[test]
    fn test_refresh_with_unresolved_value_is_not_accepted() {
        let accepted = Arc::new(Mutex::new(0));
        let manager = ScriptedManager {
            latest: VecDeque::from([
                Ok(Some(snapshot("timeout = 30\nhost = \"a\"", 1))),
                Ok(Some(snapshot("host = \"b\"", 2))),
            ]),
            accepted: accepted.clone(),
            ..Default::default()
        };
        let service = ConfigurationService::new("app", manager).unwrap();
        let timeout = Arc::new(ValueDefinition::<u32>::required("timeout"));
        let host = Arc::new(ValueDefinition::<String>::required("host"));
        service
            .register(
                ValueDefinitionGroup::builder("client")
                    .shared(timeout.clone())
                    .shared(host.clone())
                    .build(),
            )
            .unwrap();
        assert_eq!(*accepted.lock().unwrap(), 1);

        match service.refresh() {
            RefreshOutcome::Applied(summary) => {
                assert_eq!(summary.values_retained(), 1);
                assert_eq!(summary.values_changed(), 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(timeout.value(), Some(30));
        assert_eq!(host.value().as_deref(), Some("b"));
        assert_eq!(*accepted.lock().unwrap(), 1);
    }

    #[test]
    fn test_register_unresolved_required_fails_and_deregister() {
        let manager = ScriptedManager {
            latest: VecDeque::from([Ok(Some(snapshot("timeout = 30", 1)))]),
            ..Default::default()
        };
        let service = ConfigurationService::new("app", manager).unwrap();

        let err = service
            .register(
                ValueDefinitionGroup::builder("db")
                    .value(ValueDefinition::<String>::required("db.url"))
                    .build(),
            )
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Unresolved { .. }));
        assert_eq!(service.registered_groups(), 0);

        let handle = service
            .register(
                ValueDefinitionGroup::builder("client")
                    .value(ValueDefinition::<u32>::required("timeout"))
                    .build(),
            )
            .unwrap();
        assert!(service.deregister(handle));
        assert!(!service.deregister(handle));
    }
}
