//! Chat Widgets
//!
//! Named rich-content renderers that bot (and user or custom) messages embed
//! by setting [`Message::widget`](chatkit_core::Message). A widget sees a
//! snapshot of the conversation, the message payload, the actions bag, and
//! the scroll trigger.
//!
//! Registration validates the name once; lookups afterwards are exact-name
//! and never fail, a missing widget simply renders nothing.

pub mod text_block;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ratatui::text::Text;
use thiserror::Error;

use chatkit_core::{Actions, ConversationState, ScrollTrigger};

pub use text_block::TranscriptView;

/// Errors raised while registering widgets or custom message renderers
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Names must be non-empty
    #[error("registration name must not be empty")]
    EmptyName,
    /// Each name can be registered once
    #[error("`{0}` is already registered")]
    Duplicate(String),
    /// `bot` and `user` are built-in message types
    #[error("`{0}` is a built-in message type")]
    Reserved(String),
}

/// What a widget is rendered against
#[derive(Clone, Copy)]
pub struct WidgetContext<'a> {
    /// Conversation snapshot
    pub state: &'a ConversationState,
    /// Re-anchor the transcript, when scroll anchoring is on
    pub scroll: Option<&'a dyn ScrollTrigger>,
    /// The embedding message's payload
    pub payload: Option<&'a serde_json::Value>,
    /// Named application callbacks
    pub actions: &'a Actions,
}

impl fmt::Debug for WidgetContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetContext")
            .field("messages", &self.state.messages.len())
            .field("payload", &self.payload)
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}

/// A named rich-content renderer
pub trait ChatWidget: Send + Sync {
    /// Registry name
    fn name(&self) -> &str;

    /// Render against the current context
    fn render(&self, ctx: &WidgetContext<'_>) -> Text<'static>;
}

/// A widget backed by a closure
pub struct FnWidget<F> {
    name: String,
    render: F,
}

impl<F> FnWidget<F>
where
    F: Fn(&WidgetContext<'_>) -> Text<'static> + Send + Sync,
{
    /// Wrap `render` under `name`
    pub fn new(name: impl Into<String>, render: F) -> Self {
        Self {
            name: name.into(),
            render,
        }
    }
}

impl<F> ChatWidget for FnWidget<F>
where
    F: Fn(&WidgetContext<'_>) -> Text<'static> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, ctx: &WidgetContext<'_>) -> Text<'static> {
        (self.render)(ctx)
    }
}

/// Name to widget lookup
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    widgets: HashMap<String, Arc<dyn ChatWidget>>,
}

impl fmt::Debug for WidgetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.widgets.keys()).finish()
    }
}

impl WidgetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a widget under its own name
    pub fn register(&mut self, widget: impl ChatWidget + 'static) -> Result<(), RegistryError> {
        let name = widget.name().to_string();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.widgets.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        tracing::debug!(widget = %name, "Registered widget");
        self.widgets.insert(name, Arc::new(widget));
        Ok(())
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.widgets.contains_key(name)
    }

    /// Number of registered widgets
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Render the widget called `name`, if any
    ///
    /// `None` for a message without a widget, or for an unregistered name.
    pub fn get_widget(&self, name: Option<&str>, ctx: &WidgetContext<'_>) -> Option<Text<'static>> {
        let name = name?;
        match self.widgets.get(name) {
            Some(widget) => Some(widget.render(ctx)),
            None => {
                tracing::debug!(widget = name, "No widget registered under this name");
                None
            }
        }
    }
}
