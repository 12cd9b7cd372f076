//! Message Rendering
//!
//! Turns a [`ConversationState`] into terminal lines. Each message is
//! classified once and dispatched to its visual branch:
//!
//! - **Bot**: avatar (per the grouping rule), bubble text or a loading
//!   indicator, then its widget once loading is over
//! - **User**: custom body hook, else the attachment grid, else the text;
//!   then its widget
//! - **Custom**: the tag's renderer, then its widget
//!
//! Messages whose tag has no branch are skipped with a warning. Rendering is
//! a pure function of the state, the registries, and the preview cache.

use ratatui::layout::Alignment;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span, Text};
use unicode_width::UnicodeWidthStr;

use chatkit_core::{
    classify, ActionProvider, Actions, ConversationState, FileRef, Message, MessageClass,
    MessageId, MessageType, PreviewCache, ScrollTrigger,
};

use crate::custom::{CustomComponents, CustomMessageContext, CustomMessages};
use crate::theme::Theme;
use crate::widgets::{WidgetContext, WidgetRegistry};

/// Shown in place of a bot bubble's text while it loads
pub const LOADING_INDICATOR: &str = "...";

/// Everything a render pass reads besides the state
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    /// Named widgets
    pub widgets: &'a WidgetRegistry,
    /// Custom message renderers
    pub custom_messages: &'a CustomMessages,
    /// Component hooks
    pub components: &'a CustomComponents,
    /// Application action provider
    pub action_provider: &'a dyn ActionProvider,
    /// Named application callbacks
    pub actions: &'a Actions,
    /// Scroll trigger handed to widgets, when anchoring is on
    pub scroll: Option<&'a dyn ScrollTrigger>,
    /// Preview URLs for attachments, synced for this frame
    pub previews: Option<&'a PreviewCache>,
    /// Styles
    pub theme: &'a Theme,
    /// Available columns
    pub width: u16,
}

/// Which branch rendered a message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayRole {
    /// Bot bubble
    Bot,
    /// User bubble
    User,
    /// Custom renderer for this tag
    Custom(String),
}

/// A rendered transcript entry
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayMessage {
    /// Render key (the message ID)
    pub key: MessageId,
    /// Branch taken
    pub role: DisplayRole,
    /// Whether the avatar glyph is drawn
    pub avatar: bool,
    /// Bubble lines
    pub body: Vec<Line<'static>>,
    /// Widget lines, if a widget resolved and is showing
    pub widget: Option<Text<'static>>,
}

impl DisplayMessage {
    /// Body followed by widget
    pub fn lines(&self) -> impl Iterator<Item = &Line<'static>> {
        self.body
            .iter()
            .chain(self.widget.iter().flat_map(|text| text.lines.iter()))
    }
}

/// The rendered transcript
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript {
    /// Pre-rendered history shown above the messages
    pub history: Vec<Line<'static>>,
    /// One entry per renderable message, in order
    pub messages: Vec<DisplayMessage>,
}

impl Transcript {
    /// Flatten to lines, one blank line between entries
    pub fn lines(&self) -> Vec<Line<'static>> {
        let mut out = self.history.clone();
        if !out.is_empty() {
            out.push(Line::default());
        }
        for message in &self.messages {
            out.extend(message.lines().cloned());
            out.push(Line::default());
        }
        out
    }
}

// ============================================================================
// Avatar Rule
// ============================================================================

/// Computed avatar visibility for the bot message at `index`
///
/// The first message shows it. A message right after a bot message without a
/// widget does not, so consecutive plain bot bubbles group under one avatar.
pub fn show_avatar(messages: &[Message], index: usize) -> bool {
    if index == 0 {
        return true;
    }
    match messages.get(index - 1) {
        Some(previous) => !(previous.kind == MessageType::Bot && previous.widget.is_none()),
        None => true,
    }
}

/// Avatar visibility with the per-message override applied
pub fn avatar_visible(messages: &[Message], index: usize) -> bool {
    messages
        .get(index)
        .and_then(|m| m.with_avatar)
        .unwrap_or_else(|| show_avatar(messages, index))
}

// ============================================================================
// Rendering
// ============================================================================

/// Render the whole conversation
pub fn render_transcript(
    state: &ConversationState,
    rendered_history: Option<&str>,
    ctx: &RenderContext<'_>,
) -> Transcript {
    let history = rendered_history
        .filter(|h| !h.is_empty())
        .map(|h| {
            wrap(h, ctx.width as usize)
                .into_iter()
                .map(|line| Line::styled(line, ctx.theme.dim))
                .collect()
        })
        .unwrap_or_default();

    let messages = (0..state.messages.len())
        .filter_map(|index| render_message(state, index, ctx))
        .collect();

    Transcript { history, messages }
}

/// Render the message at `index`, or `None` if it has no visual branch
pub fn render_message(state: &ConversationState, index: usize, ctx: &RenderContext<'_>) -> Option<DisplayMessage> {
    let message = state.messages.get(index)?;
    let class = match classify(message, ctx.custom_messages) {
        Ok(class) => class,
        Err(err) => {
            tracing::warn!(error = %err, "Skipping unrenderable message");
            return None;
        }
    };

    let widget_ctx = WidgetContext {
        state,
        scroll: ctx.scroll,
        payload: message.payload.as_ref(),
        actions: ctx.actions,
    };
    let widget = ctx.widgets.get_widget(message.widget.as_deref(), &widget_ctx);

    let rendered = match class {
        MessageClass::Bot => {
            let avatar = avatar_visible(&state.messages, index);
            DisplayMessage {
                key: message.id.clone(),
                role: DisplayRole::Bot,
                avatar,
                body: bot_body(message, avatar, ctx),
                widget: widget.filter(|_| !message.loading),
            }
        }
        MessageClass::User => DisplayMessage {
            key: message.id.clone(),
            role: DisplayRole::User,
            avatar: true,
            body: user_body(message, ctx),
            widget,
        },
        MessageClass::Custom(tag) => {
            let body = ctx
                .custom_messages
                .get(tag)
                .map(|renderer| {
                    renderer
                        .render(&CustomMessageContext {
                            state,
                            scroll: ctx.scroll,
                            action_provider: ctx.action_provider,
                            payload: message.payload.as_ref(),
                            actions: ctx.actions,
                        })
                        .lines
                })
                .unwrap_or_default();
            DisplayMessage {
                key: message.id.clone(),
                role: DisplayRole::Custom(tag.to_string()),
                avatar: false,
                body,
                widget,
            }
        }
    };
    Some(rendered)
}

fn bot_body(message: &Message, avatar: bool, ctx: &RenderContext<'_>) -> Vec<Line<'static>> {
    let glyph = ctx.components.bot_avatar();
    let gutter = glyph.width() + 1;
    let blank = " ".repeat(gutter);
    let lead = if avatar { format!("{glyph} ") } else { blank.clone() };

    if message.loading {
        return vec![Line::from(vec![
            Span::styled(lead, ctx.theme.bot_message),
            Span::styled(
                LOADING_INDICATOR,
                ctx.theme.dim.add_modifier(Modifier::ITALIC),
            ),
        ])];
    }

    let text_width = (ctx.width as usize).saturating_sub(gutter).max(1);
    wrap(&message.text, text_width)
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let prefix = if i == 0 { lead.clone() } else { blank.clone() };
            Line::from(vec![
                Span::styled(prefix, ctx.theme.bot_message.add_modifier(Modifier::BOLD)),
                Span::styled(line, ctx.theme.bot_message),
            ])
        })
        .collect()
}

fn user_body(message: &Message, ctx: &RenderContext<'_>) -> Vec<Line<'static>> {
    let glyph = ctx.components.user_avatar();
    let suffix = format!(" {glyph}");

    let mut lines: Vec<Line<'static>> = if let Some(custom) = &ctx.components.user_chat_message {
        custom(&message.text).lines
    } else if message.has_attachments() {
        message
            .attachments
            .iter()
            .map(|file| attachment_line(file, ctx))
            .collect()
    } else {
        let text_width = (ctx.width as usize).saturating_sub(suffix.width()).max(1);
        wrap(&message.text, text_width)
            .into_iter()
            .map(|line| Line::styled(line, ctx.theme.user_message))
            .collect()
    };

    if let Some(last) = lines.last_mut() {
        last.spans
            .push(Span::styled(suffix, ctx.theme.user_message.add_modifier(Modifier::BOLD)));
    }
    lines
        .into_iter()
        .map(|line| line.alignment(Alignment::Right))
        .collect()
}

fn attachment_line(file: &FileRef, ctx: &RenderContext<'_>) -> Line<'static> {
    let mut spans = vec![
        Span::styled("[image] ", ctx.theme.dim),
        Span::styled(file.name.clone(), ctx.theme.user_message),
    ];
    if let Some(url) = ctx.previews.and_then(|cache| cache.url_for(file)) {
        spans.push(Span::styled(format!(" <{url}>"), ctx.theme.dim));
    }
    Line::from(spans)
}

/// Wrap text to `width`, keeping blank lines
pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    text.lines()
        .flat_map(|line| {
            if line.is_empty() {
                vec![String::new()]
            } else {
                textwrap::wrap(line, width.max(1))
                    .into_iter()
                    .map(|cow| cow.to_string())
                    .collect()
            }
        })
        .collect()
}
