//! Value definitions and groups.
//!
//! A [`ValueDefinitionGroup`] bundles related [`ValueDefinition`]s so a
//! consumer is told about a reload once, after every member has been
//! brought up to date. Listeners may reference their target weakly; a
//! dropped target turns its listener into a no-op.

pub mod definition;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{ConfigResult, ConfigurationError};
use crate::source::ConfigurationSource;

pub use definition::ValueDefinition;

/// Whether a listener reached its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    TargetDropped,
}

/// Result of bringing one definition up to date with a source.
#[derive(Debug)]
pub enum DefinitionUpdate {
    Unchanged,
    Changed(Delivery),
    /// Resolution failed; the previously held value was kept.
    Retained(ConfigurationError),
}

/// Type-erased view of a [`ValueDefinition`].
pub trait Definition: Send + Sync + fmt::Debug {
    fn path(&self) -> &str;
    fn is_required(&self) -> bool;
    fn is_list(&self) -> bool;
    fn type_name(&self) -> &'static str;

    /// Resolve against `source` without touching held state.
    fn check(&self, source: &dyn ConfigurationSource) -> ConfigResult<()>;

    /// Resolve, compare with the held value and notify on change.
    fn update(&self, source: &dyn ConfigurationSource) -> DefinitionUpdate;
}

/// Passed to group listeners after a refresh changed at least one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChange {
    pub group: String,
    /// Paths whose values changed, in definition order.
    pub changed: Vec<String>,
}

type GroupListener = Box<dyn Fn(&GroupChange) -> Delivery + Send + Sync>;

/// Related definitions updated and notified as a unit.
pub struct ValueDefinitionGroup {
    name: String,
    values: Vec<Arc<dyn Definition>>,
    listener: Option<GroupListener>,
    once_only: bool,
    update_lock: Mutex<()>,
}

impl ValueDefinitionGroup {
    pub fn builder(name: impl Into<String>) -> ValueDefinitionGroupBuilder {
        ValueDefinitionGroupBuilder {
            name: name.into(),
            values: Vec::new(),
            listener: None,
            once_only: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Arc<dyn Definition>] {
        &self.values
    }

    /// Bound once at registration and never refreshed.
    pub fn is_once_only(&self) -> bool {
        self.once_only
    }

    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// Serializes updates of this group across concurrent refreshes.
    pub(crate) fn lock_updates(&self) -> MutexGuard<'_, ()> {
        self.update_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn notify(&self, change: &GroupChange) -> Delivery {
        match &self.listener {
            Some(listener) => listener(change),
            None => Delivery::Delivered,
        }
    }
}

impl fmt::Debug for ValueDefinitionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueDefinitionGroup")
            .field("name", &self.name)
            .field("values", &self.values)
            .field("listener", &self.listener.is_some())
            .field("once_only", &self.once_only)
            .finish()
    }
}

/// Builder for [`ValueDefinitionGroup`]. Membership is fixed by `build`.
pub struct ValueDefinitionGroupBuilder {
    name: String,
    values: Vec<Arc<dyn Definition>>,
    listener: Option<GroupListener>,
    once_only: bool,
}

impl ValueDefinitionGroupBuilder {
    /// Add a definition owned by the group.
    pub fn value(self, definition: impl Definition + 'static) -> Self {
        self.shared(Arc::new(definition))
    }

    /// Add a definition the caller keeps a handle to, e.g. to read
    /// [`ValueDefinition::value`] later.
    pub fn shared(mut self, definition: Arc<dyn Definition>) -> Self {
        self.values.push(definition);
        self
    }

    pub fn on_change<F>(mut self, listener: F) -> Self
    where
        F: Fn(&GroupChange) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(move |change| {
            listener(change);
            Delivery::Delivered
        }));
        self
    }

    /// Group listener holding `target` weakly.
    pub fn bind<O, F>(mut self, target: &Arc<O>, listener: F) -> Self
    where
        O: Send + Sync + 'static,
        F: Fn(&O, &GroupChange) + Send + Sync + 'static,
    {
        let target = Arc::downgrade(target);
        self.listener = Some(Box::new(move |change| match target.upgrade() {
            Some(target) => {
                listener(&target, change);
                Delivery::Delivered
            }
            None => Delivery::TargetDropped,
        }));
        self
    }

    pub fn once_only(mut self) -> Self {
        self.once_only = true;
        self
    }

    pub fn build(self) -> ValueDefinitionGroup {
        ValueDefinitionGroup {
            name: self.name,
            values: self.values,
            listener: self.listener,
            once_only: self.once_only,
            update_lock: Mutex::new(()),
        }
    }
}
