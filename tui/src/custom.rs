//! Application-defined Rendering
//!
//! Custom message renderers (keyed by message `type` tag) and the smaller
//! component hooks: header, user bubble, avatar glyphs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ratatui::text::{Line, Text};

use chatkit_core::{ActionProvider, Actions, ConversationState, CustomTags, ScrollTrigger};

use crate::widgets::RegistryError;

/// What a custom message renderer is rendered against
#[derive(Clone, Copy)]
pub struct CustomMessageContext<'a> {
    /// Conversation snapshot
    pub state: &'a ConversationState,
    /// Re-anchor the transcript, when scroll anchoring is on
    pub scroll: Option<&'a dyn ScrollTrigger>,
    /// Application action provider
    pub action_provider: &'a dyn ActionProvider,
    /// The message payload
    pub payload: Option<&'a serde_json::Value>,
    /// Named application callbacks
    pub actions: &'a Actions,
}

/// Renders messages carrying one custom tag
pub trait CustomMessageRenderer: Send + Sync {
    /// Render one message
    fn render(&self, ctx: &CustomMessageContext<'_>) -> Text<'static>;
}

impl<F> CustomMessageRenderer for F
where
    F: Fn(&CustomMessageContext<'_>) -> Text<'static> + Send + Sync,
{
    fn render(&self, ctx: &CustomMessageContext<'_>) -> Text<'static> {
        self(ctx)
    }
}

/// Tag to renderer lookup
#[derive(Clone, Default)]
pub struct CustomMessages {
    renderers: HashMap<String, Arc<dyn CustomMessageRenderer>>,
}

impl fmt::Debug for CustomMessages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.renderers.keys()).finish()
    }
}

impl CustomMessages {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `renderer` for messages tagged `tag`
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        renderer: impl CustomMessageRenderer + 'static,
    ) -> Result<(), RegistryError> {
        let tag = tag.into();
        if tag.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if matches!(tag.as_str(), "bot" | "user") {
            return Err(RegistryError::Reserved(tag));
        }
        if self.renderers.contains_key(&tag) {
            return Err(RegistryError::Duplicate(tag));
        }
        tracing::debug!(%tag, "Registered custom message renderer");
        self.renderers.insert(tag, Arc::new(renderer));
        Ok(())
    }

    /// Renderer for `tag`
    pub fn get(&self, tag: &str) -> Option<&dyn CustomMessageRenderer> {
        self.renderers.get(tag).map(|renderer| &**renderer)
    }
}

impl CustomTags for CustomMessages {
    fn contains_tag(&self, tag: &str) -> bool {
        self.renderers.contains_key(tag)
    }
}

// ============================================================================
// Component Hooks
// ============================================================================

/// Replaces the header bar; receives the action provider
pub type HeaderRenderer = Arc<dyn Fn(&dyn ActionProvider) -> Line<'static> + Send + Sync>;

/// Replaces the user bubble body; receives the message text
pub type UserMessageRenderer = Arc<dyn Fn(&str) -> Text<'static> + Send + Sync>;

/// Default bot avatar glyph
pub const DEFAULT_BOT_AVATAR: &str = "◆";

/// Default user avatar glyph
pub const DEFAULT_USER_AVATAR: &str = "●";

/// Optional overrides for built-in pieces of the surface
#[derive(Clone, Default)]
pub struct CustomComponents {
    /// Header bar
    pub header: Option<HeaderRenderer>,
    /// User bubble body (wins over the attachment grid)
    pub user_chat_message: Option<UserMessageRenderer>,
    /// Bot avatar glyph
    pub bot_avatar: Option<String>,
    /// User avatar glyph
    pub user_avatar: Option<String>,
}

impl fmt::Debug for CustomComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomComponents")
            .field("header", &self.header.is_some())
            .field("user_chat_message", &self.user_chat_message.is_some())
            .field("bot_avatar", &self.bot_avatar)
            .field("user_avatar", &self.user_avatar)
            .finish()
    }
}

impl CustomComponents {
    /// Bot avatar glyph in use
    pub fn bot_avatar(&self) -> &str {
        self.bot_avatar.as_deref().unwrap_or(DEFAULT_BOT_AVATAR)
    }

    /// User avatar glyph in use
    pub fn user_avatar(&self) -> &str {
        self.user_avatar.as_deref().unwrap_or(DEFAULT_USER_AVATAR)
    }
}
