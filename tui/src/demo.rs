//! Demo Collaborators
//!
//! The parser, widget, custom message and hooks the `chatkit-tui` binary runs
//! with. An embedding application supplies its own; these exist so the
//! surface is usable out of the box.
//!
//! - `/help` invokes the `help` action
//! - `/notice <text>` posts a `notice` custom message
//! - picked files get a `file-summary` widget reply
//! - anything else is echoed back after a short "typing" delay

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use serde_json::json;

use chatkit_core::{
    ActionProvider, Actions, ChatConfig, ChatStore, FileRef, Message, MessageParser,
};

use crate::custom::{CustomComponents, CustomMessageContext, CustomMessageRenderer, CustomMessages};
use crate::theme::{BOT_ACCENT, DIM_GRAY, NOTICE_YELLOW};
use crate::widgets::{ChatWidget, RegistryError, WidgetContext, WidgetRegistry};

/// Delay before the echo reply fills in
pub const REPLY_DELAY: Duration = Duration::from_millis(600);

const HELP_TEXT: &str = "Type a message and press Enter. Ctrl+O attaches images \
(.png/.jpg/.jpeg, up to 5), Alt+1..5 removes one. /notice <text> posts a notice.";

// ============================================================================
// Parser
// ============================================================================

/// Echoes submissions back as bot replies
pub struct EchoParser {
    store: ChatStore,
    actions: Actions,
    delay: Duration,
}

impl EchoParser {
    pub fn new(store: ChatStore, actions: Actions) -> Self {
        Self {
            store,
            actions,
            delay: REPLY_DELAY,
        }
    }

    /// Override the reply delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn echo(&self, text: &str) {
        let reply = format!("You said: {text}");
        let id = self.store.append_message(Message::bot("").loading());

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            self.store.update_message(&id, |m| {
                m.text = reply;
                m.loading = false;
            });
            return;
        };

        self.store.set_input_disabled(true);
        let store = self.store.clone();
        let delay = self.delay;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            store.update_message(&id, |m| {
                m.text = reply;
                m.loading = false;
            });
            store.set_input_disabled(false);
        });
    }
}

impl MessageParser for EchoParser {
    fn parse(&self, text: &str, files: Option<&[FileRef]>) {
        if let Some(files) = files {
            let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
            let noun = if files.len() == 1 { "image" } else { "images" };
            self.store.append_message(
                Message::bot(format!("Got {} {noun}.", files.len()))
                    .with_widget(FileSummaryWidget::NAME)
                    .with_payload(json!({ "files": names })),
            );
            return;
        }

        let trimmed = text.trim();
        if trimmed == "/help" {
            self.actions.invoke("help", &self.store);
        } else if let Some(notice) = trimmed.strip_prefix("/notice ") {
            self.store.append_message(
                Message::custom(NoticeRenderer::TAG).with_payload(json!({ "text": notice })),
            );
        } else {
            self.echo(trimmed);
        }
    }
}

// ============================================================================
// Widget
// ============================================================================

/// Lists the files named in the payload
pub struct FileSummaryWidget;

impl FileSummaryWidget {
    pub const NAME: &'static str = "file-summary";
}

impl ChatWidget for FileSummaryWidget {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn render(&self, ctx: &WidgetContext<'_>) -> Text<'static> {
        let files = ctx
            .payload
            .and_then(|p| p.get("files"))
            .and_then(serde_json::Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        files
            .into_iter()
            .map(|name| {
                Line::from(vec![
                    Span::styled("  • ", Style::default().fg(DIM_GRAY)),
                    Span::styled(name, Style::default().fg(BOT_ACCENT)),
                ])
            })
            .collect::<Vec<_>>()
            .into()
    }
}

// ============================================================================
// Custom Message
// ============================================================================

/// Renders `notice` messages
pub struct NoticeRenderer;

impl NoticeRenderer {
    pub const TAG: &'static str = "notice";
}

impl CustomMessageRenderer for NoticeRenderer {
    fn render(&self, ctx: &CustomMessageContext<'_>) -> Text<'static> {
        let text = ctx
            .payload
            .and_then(|p| p.get("text"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let style = Style::default().fg(NOTICE_YELLOW);
        Text::from(Line::from(vec![
            Span::styled("! ", style.add_modifier(Modifier::BOLD)),
            Span::styled(text, style),
        ]))
    }
}

// ============================================================================
// Action Provider
// ============================================================================

/// What the demo header reads through the action provider
#[derive(Clone, Debug)]
pub struct DemoActionProvider {
    pub bot_name: String,
}

impl ActionProvider for DemoActionProvider {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// Everything the binary hands to the app
pub struct Collaborators {
    pub parser: Arc<dyn MessageParser>,
    pub widgets: WidgetRegistry,
    pub custom_messages: CustomMessages,
    pub components: CustomComponents,
    pub action_provider: Arc<dyn ActionProvider>,
    pub actions: Actions,
}

/// Build the demo collaborators for `store`
pub fn collaborators(config: &ChatConfig, store: &ChatStore) -> Result<Collaborators, RegistryError> {
    let actions = Actions::new().with("help", |store| {
        store.append_message(Message::bot(HELP_TEXT));
    });

    let mut widgets = WidgetRegistry::new();
    widgets.register(FileSummaryWidget)?;

    let mut custom_messages = CustomMessages::new();
    custom_messages.register(NoticeRenderer::TAG, NoticeRenderer)?;

    let header_text = config.header();
    let components = CustomComponents {
        header: Some(Arc::new(move |provider: &dyn ActionProvider| {
            let online = provider
                .as_any()
                .downcast_ref::<DemoActionProvider>()
                .map(|p| format!("  · {} is online", p.bot_name))
                .unwrap_or_default();
            Line::from(format!(" {header_text}{online}"))
        })),
        ..CustomComponents::default()
    };

    let parser = EchoParser::new(store.clone(), actions.clone());

    Ok(Collaborators {
        parser: Arc::new(parser),
        widgets,
        custom_messages,
        components,
        action_provider: Arc::new(DemoActionProvider {
            bot_name: config.bot_name.clone(),
        }),
        actions,
    })
}
