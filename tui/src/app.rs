//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, mouse, resize, store changes)
//! - ConductorClient for orchestration
//! - Rendering of header, transcript, attachment strip, input and status
//!
//! # Frame Pipeline
//!
//! Every frame first reconciles preview URLs against the live attachments,
//! then renders. A URL released during reconciliation was last used by the
//! previous frame, which has already been drawn.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};
use unicode_width::UnicodeWidthStr;

use chatkit_core::{
    ActionProvider, Actions, AddFilesOutcome, ChatConfig, ChatStore, SubmitOutcome, MAX_ATTACHMENTS,
};

use crate::conductor_client::ConductorClient;
use crate::custom::{CustomComponents, CustomMessages};
use crate::demo::Collaborators;
use crate::display::{render_transcript, RenderContext};
use crate::theme::{Theme, DIM_GRAY, ERROR_RED, NOTICE_YELLOW};
use crate::widgets::{TranscriptView, WidgetRegistry};

/// Input box height (separator + text lines)
const INPUT_HEIGHT: u16 = 3;

/// Redraw at least this often (loading replies, deferred scrolls)
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Rows per mouse wheel notch
const WHEEL_ROWS: isize = 3;

/// What typed keys edit
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    /// The message text
    Text,
    /// A space-separated list of paths to attach
    Attach(String),
}

/// Main application state
pub struct App {
    // === Core State ===
    /// Is the app still running?
    running: bool,

    // === Conductor Integration ===
    /// Client for the embedded conductor
    client: ConductorClient,

    // === Application Collaborators ===
    widgets: WidgetRegistry,
    custom_messages: CustomMessages,
    components: CustomComponents,
    action_provider: Arc<dyn ActionProvider>,
    actions: Actions,

    // === Presentation ===
    theme: Theme,
    header_text: String,
    placeholder: String,
    rendered_history: Option<String>,

    // === Input State ===
    mode: InputMode,
    /// One-shot status line message
    notice: Option<(String, Style)>,
    /// Transcript height at the last render (page size)
    transcript_height: u16,
}

impl App {
    /// Create a new App over `store`
    pub fn new(config: &ChatConfig, store: ChatStore, kit: Collaborators) -> Self {
        let client = ConductorClient::new(config, store, kit.parser);
        Self {
            running: true,
            client,
            widgets: kit.widgets,
            custom_messages: kit.custom_messages,
            components: kit.components,
            action_provider: kit.action_provider,
            actions: kit.actions,
            theme: Theme::from_styles(&config.custom_styles),
            header_text: config.header(),
            placeholder: config.placeholder_text.clone(),
            rendered_history: config.rendered_history().map(str::to_string),
            mode: InputMode::Text,
            notice: None,
            transcript_height: 0,
        }
    }

    /// Only accept text the validator approves
    #[must_use]
    pub fn with_validator(mut self, validator: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.client = self.client.with_validator(validator);
        self
    }

    /// Whether the event loop should keep going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current input mode
    pub fn mode(&self) -> &InputMode {
        &self.mode
    }

    /// The conductor client
    pub fn client(&self) -> &ConductorClient {
        &self.client
    }

    /// Main event loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();
        let mut frame_tick = tokio::time::interval(FRAME_INTERVAL);

        // Render initial frame immediately so user sees UI
        self.render(terminal)?;

        while self.running {
            tokio::select! {
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(event)) => self.handle_event(event),
                        Some(Err(e)) => tracing::warn!("Terminal event error: {}", e),
                        None => self.running = false,
                    }
                }
                () = self.client.changed() => {}
                _ = frame_tick.tick() => {}
            }

            self.client.poll_changes();
            self.render(terminal)?;
        }

        self.client.shutdown();
        tracing::info!("Event loop finished");
        Ok(())
    }

    /// Draw one frame
    pub fn render<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        terminal.draw(|frame| self.draw(frame))?;
        Ok(())
    }

    // ========================================================================
    // Event Handling
    // ========================================================================

    /// Dispatch one terminal event
    pub fn handle_event(&mut self, event: Event) {
        match event {
            // Only handle Press events (not Release or Repeat)
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(w, h) => tracing::debug!(width = w, height = h, "Terminal resized"),
            _ => {}
        }
    }

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        match key.code {
            // Quit (Esc leaves attach mode first)
            KeyCode::Esc => {
                if matches!(self.mode, InputMode::Attach(_)) {
                    self.mode = InputMode::Text;
                } else {
                    self.running = false;
                }
            }
            KeyCode::Char('c') if ctrl => self.running = false,

            // Attach mode
            KeyCode::Char('o') if ctrl => self.toggle_attach_mode(),

            // Remove a pending file
            KeyCode::Char(c @ '1'..='9') if alt => {
                let index = c as usize - '1' as usize;
                self.remove_pending(index);
            }

            KeyCode::Enter => match std::mem::replace(&mut self.mode, InputMode::Text) {
                InputMode::Attach(paths) => self.attach(&paths),
                InputMode::Text => self.submit(),
            },

            // Typing
            KeyCode::Char(c) if !ctrl && !alt => match &mut self.mode {
                InputMode::Attach(paths) => paths.push(c),
                InputMode::Text => {
                    if !self.client.type_char(c) {
                        self.set_notice("Input is disabled", Style::default().fg(DIM_GRAY));
                    }
                }
            },
            KeyCode::Backspace => match &mut self.mode {
                InputMode::Attach(paths) => {
                    paths.pop();
                }
                InputMode::Text => {
                    self.client.backspace();
                }
            },

            // Transcript scrolling
            KeyCode::PageUp => self.client.scroll_by(-self.page_size()),
            KeyCode::PageDown => self.client.scroll_by(self.page_size()),
            KeyCode::End if ctrl => self.client.scroll_to_bottom(),

            _ => {}
        }
    }

    /// Handle mouse input
    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.client.scroll_by(-WHEEL_ROWS),
            MouseEventKind::ScrollDown => self.client.scroll_by(WHEEL_ROWS),
            _ => {}
        }
    }

    fn page_size(&self) -> isize {
        (self.transcript_height / 2).max(1) as isize
    }

    fn toggle_attach_mode(&mut self) {
        if matches!(self.mode, InputMode::Attach(_)) {
            self.mode = InputMode::Text;
            return;
        }
        let disabled = self.client.store().read(|s| s.conversation.is_file_input_disabled);
        if disabled {
            self.set_notice("File input is disabled", Style::default().fg(DIM_GRAY));
            return;
        }
        self.mode = InputMode::Attach(String::new());
    }

    fn attach(&mut self, paths: &str) {
        match self.client.attach_paths(paths) {
            AddFilesOutcome::Added { total } => {
                self.set_notice(
                    format!("{total}/{MAX_ATTACHMENTS} files attached"),
                    Style::default().fg(DIM_GRAY),
                );
            }
            AddFilesOutcome::Rejected(err) => {
                self.set_notice(err.to_string(), Style::default().fg(ERROR_RED));
            }
            AddFilesOutcome::Disabled => {
                self.set_notice("File input is disabled", Style::default().fg(DIM_GRAY));
            }
        }
    }

    fn remove_pending(&mut self, index: usize) {
        match self.client.remove_pending(index) {
            Ok(file) => self.set_notice(format!("Removed {}", file.name), Style::default().fg(DIM_GRAY)),
            Err(err) => self.set_notice(err.to_string(), Style::default().fg(ERROR_RED)),
        }
    }

    fn submit(&mut self) {
        match self.client.submit() {
            SubmitOutcome::Accepted(_) => self.notice = None,
            SubmitOutcome::Dropped(reason) => {
                tracing::debug!(?reason, "Submission dropped");
            }
        }
    }

    fn set_notice(&mut self, text: impl Into<String>, style: Style) {
        self.notice = Some((text.into(), style));
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Lay out and draw every region
    pub fn draw(&mut self, frame: &mut Frame<'_>) {
        self.client.sync_previews();

        let pending = self.client.pending();
        let strip_height = u16::from(!pending.files.is_empty());
        let [header, transcript, strip, input, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(strip_height),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.draw_header(frame, header);
        self.draw_transcript(frame, transcript);
        if strip_height > 0 {
            self.draw_attachment_strip(frame, strip, &pending.files);
        }
        self.draw_input(frame, input, &pending.text);
        self.draw_status(frame, status);
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect) {
        let line = match &self.components.header {
            Some(header) => header(self.action_provider.as_ref()),
            None => Line::from(format!(" {}", self.header_text)),
        };
        frame.render_widget(Paragraph::new(line).style(self.theme.header), area);
    }

    fn draw_transcript(&mut self, frame: &mut Frame<'_>, area: Rect) {
        self.transcript_height = area.height;
        let state = self.client.snapshot();
        let ctx = RenderContext {
            widgets: &self.widgets,
            custom_messages: &self.custom_messages,
            components: &self.components,
            action_provider: self.action_provider.as_ref(),
            actions: &self.actions,
            scroll: self.client.scroll_trigger(),
            previews: Some(self.client.previews()),
            theme: &self.theme,
            width: area.width,
        };
        let lines = render_transcript(&state, self.rendered_history.as_deref(), &ctx).lines();

        let mut viewport = self.client.viewport().lock();
        frame.render_stateful_widget(TranscriptView::new(&lines), area, &mut *viewport);
    }

    fn draw_attachment_strip(&self, frame: &mut Frame<'_>, area: Rect, files: &[chatkit_core::FileRef]) {
        let mut spans = vec![Span::styled(" ", self.theme.dim)];
        for (i, file) in files.iter().enumerate() {
            spans.push(Span::styled(format!("[{}] ", i + 1), self.theme.dim));
            spans.push(Span::styled(file.name.clone(), self.theme.input));
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled("Alt+n removes", self.theme.dim));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_input(&self, frame: &mut Frame<'_>, area: Rect, text: &str) {
        let (input_disabled, file_disabled) = self.client.store().read(|s| {
            (s.conversation.is_input_disabled, s.conversation.is_file_input_disabled)
        });

        let [separator, body] = Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(area);

        // Separator with the attach and send "buttons" at the right edge
        let attach_style = if file_disabled { self.theme.send_button_disabled } else { self.theme.dim };
        let send_style = if input_disabled { self.theme.send_button_disabled } else { self.theme.send_button };
        let buttons = vec![Span::styled("[ Attach ^O ]", attach_style), Span::raw(" "), Span::styled("[ Send ⏎ ]", send_style)];
        let buttons_width: usize = buttons.iter().map(|s| s.content.width()).sum();
        let rule = "─".repeat((separator.width as usize).saturating_sub(buttons_width + 1));
        let mut spans = vec![Span::styled(rule, self.theme.dim), Span::raw(" ")];
        spans.extend(buttons);
        frame.render_widget(Paragraph::new(Line::from(spans)), separator);

        let line = match &self.mode {
            InputMode::Attach(paths) => Line::from(vec![
                Span::styled("Attach: ", Style::default().fg(NOTICE_YELLOW)),
                Span::styled(format!("{paths}_"), self.theme.input),
            ]),
            InputMode::Text if text.is_empty() => Line::from(vec![
                Span::styled("> ", self.theme.input),
                Span::styled(self.placeholder.clone(), self.theme.dim),
            ]),
            InputMode::Text => {
                let style = if input_disabled { self.theme.dim } else { self.theme.input };
                Line::styled(format!("> {text}_"), style)
            }
        };

        // Keep the tail of long input visible
        let width = body.width.max(1) as usize;
        let rows = line.width().div_ceil(width);
        let skip = rows.saturating_sub(body.height as usize);
        let paragraph = Paragraph::new(line)
            .wrap(ratatui::widgets::Wrap { trim: false })
            .scroll((skip as u16, 0));
        frame.render_widget(paragraph, body);
    }

    fn draw_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let line = match &self.notice {
            Some((text, style)) => Line::styled(format!(" {text}"), *style),
            None => {
                let viewport = *self.client.viewport().lock();
                let scroll_info = if viewport.is_at_bottom() {
                    String::new()
                } else {
                    format!(" [^{} lines]", viewport.max_offset - viewport.offset)
                };
                Line::styled(
                    format!(" Enter send | Ctrl+O attach | PgUp/PgDn scroll | Esc quit{scroll_info}"),
                    self.theme.dim,
                )
            }
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}
