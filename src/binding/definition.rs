//! Typed value definitions.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::binding::{Definition, Delivery, DefinitionUpdate};
use crate::error::{ConfigResult, ConfigurationError};
use crate::source::ConfigurationSource;
use crate::value::FromValue;

type ValueListener<T> = Box<dyn Fn(Option<&T>, Option<&T>) -> Delivery + Send + Sync>;

/// A consumer's request for a typed value at a path.
///
/// List-valued definitions use `Vec<T>` as the value type.
pub struct ValueDefinition<T> {
    path: String,
    required: bool,
    listener: Option<ValueListener<T>>,
    /// Currently held resolved value; `None` while unset or absent.
    current: Mutex<Option<T>>,
}

impl<T> ValueDefinition<T>
where
    T: FromValue + Clone + fmt::Debug + Send + Sync + 'static,
{
    /// A value that must resolve. Failure on first bind is fatal.
    pub fn required(path: impl Into<String>) -> Self {
        Self::new(path.into(), true)
    }

    /// A value that may be absent.
    pub fn optional(path: impl Into<String>) -> Self {
        Self::new(path.into(), false)
    }

    fn new(path: String, required: bool) -> Self {
        Self {
            path,
            required,
            listener: None,
            current: Mutex::new(None),
        }
    }

    /// Listener called with `(new, old)` whenever the resolved value changes.
    pub fn on_change<F>(mut self, listener: F) -> Self
    where
        F: Fn(Option<&T>, Option<&T>) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(move |new, old| {
            listener(new, old);
            Delivery::Delivered
        }));
        self
    }

    /// Listener bound to `target` through a weak reference. Once the target
    /// is dropped, changes are still tracked but the listener is skipped.
    pub fn bind<O, F>(mut self, target: &Arc<O>, listener: F) -> Self
    where
        O: Send + Sync + 'static,
        F: Fn(&O, Option<&T>, Option<&T>) + Send + Sync + 'static,
    {
        let target = Arc::downgrade(target);
        self.listener = Some(Box::new(move |new, old| match target.upgrade() {
            Some(target) => {
                listener(&target, new, old);
                Delivery::Delivered
            }
            None => Delivery::TargetDropped,
        }));
        self
    }

    /// The value as of the last update, if resolved.
    pub fn value(&self) -> Option<T> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn resolve(&self, source: &dyn ConfigurationSource) -> ConfigResult<Option<T>> {
        let resolved = source.retrieve_optional::<T>(&self.path)?;
        if resolved.is_none() && self.required {
            return Err(ConfigurationError::Missing(self.path.clone()));
        }
        Ok(resolved)
    }
}

impl<T> Definition for ValueDefinition<T>
where
    T: FromValue + Clone + fmt::Debug + Send + Sync + 'static,
{
    fn path(&self) -> &str {
        &self.path
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn is_list(&self) -> bool {
        T::IS_LIST
    }

    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn check(&self, source: &dyn ConfigurationSource) -> ConfigResult<()> {
        self.resolve(source).map(|_| ())
    }

    fn update(&self, source: &dyn ConfigurationSource) -> DefinitionUpdate {
        let resolved = match self.resolve(source) {
            Ok(resolved) => resolved,
            Err(e) => return DefinitionUpdate::Retained(e),
        };

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let unchanged = match (current.as_ref(), resolved.as_ref()) {
            (Some(held), Some(new)) => held.same_value(new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return DefinitionUpdate::Unchanged;
        }
        let old = std::mem::replace(&mut *current, resolved);

        let delivery = match &self.listener {
            Some(listener) => listener(current.as_ref(), old.as_ref()),
            None => Delivery::Delivered,
        };
        DefinitionUpdate::Changed(delivery)
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueDefinition")
            .field("path", &self.path)
            .field("required", &self.required)
            .field("listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}
