//! Application Actions
//!
//! Widgets and custom message renderers are handed two things they may use to
//! talk back to the application:
//!
//! - an [`ActionProvider`]: an application-defined object, opaque to chatkit,
//!   that callers downcast to their concrete type
//! - an [`Actions`] bag: named callbacks that receive the [`ChatStore`]
//!
//! Neither is interpreted by the conversation core.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::store::ChatStore;

/// Application-defined action surface
pub trait ActionProvider: Send + Sync {
    /// Downcast hook
    fn as_any(&self) -> &dyn Any;
}

/// Action provider for applications that do not need one
#[derive(Clone, Copy, Debug, Default)]
pub struct NoActions;

impl ActionProvider for NoActions {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A named callback
pub type ActionFn = Arc<dyn Fn(&ChatStore) + Send + Sync>;

/// Named callbacks available to widgets and custom renderers
#[derive(Clone, Default)]
pub struct Actions {
    entries: BTreeMap<String, ActionFn>,
}

impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

impl Actions {
    /// Empty bag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` under `name`, replacing any previous one
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, action: impl Fn(&ChatStore) + Send + Sync + 'static) -> Self {
        self.entries.insert(name.into(), Arc::new(action));
        self
    }

    /// Whether `name` is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered action names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Run `name` against `store`. Returns `false` if no such action exists.
    pub fn invoke(&self, name: &str, store: &ChatStore) -> bool {
        match self.entries.get(name) {
            Some(action) => {
                tracing::debug!(action = name, "Invoking action");
                action(store);
                true
            }
            None => {
                tracing::warn!(action = name, "Unknown action");
                false
            }
        }
    }
}
