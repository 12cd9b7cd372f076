//! Integration Tests for the TUI surface
//!
//! Drive the [`App`] with key events and render into a [`TestBackend`], then
//! assert on what actually reached the screen.
//!
//! # Test Coverage
//!
//! 1. **Message Exchange**: user message and echo reply both render
//! 2. **Attachments**: cap rejection notice, widget reply, preview URLs
//! 3. **Robustness**: unknown message types are skipped, not fatal
//! 4. **Loading**: placeholder reply shows the loading indicator

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use pretty_assertions::assert_eq;
use ratatui::backend::TestBackend;
use ratatui::Terminal;

use chatkit_core::{ChatConfig, ChatStore, ConversationState, Message};
use chatkit_tui::demo::{collaborators, REPLY_DELAY};
use chatkit_tui::App;

// ============================================================================
// Helpers
// ============================================================================

fn app_with(config: &ChatConfig, store: ChatStore) -> App {
    let kit = collaborators(config, &store).unwrap();
    App::new(config, store, kit)
}

fn app() -> App {
    app_with(&ChatConfig::default(), ChatStore::default())
}

fn terminal() -> Terminal<TestBackend> {
    Terminal::new(TestBackend::new(80, 24)).unwrap()
}

fn press(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    app.handle_key(KeyEvent {
        code,
        modifiers,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    });
}

fn type_str(app: &mut App, text: &str) {
    for c in text.chars() {
        press(app, KeyCode::Char(c), KeyModifiers::NONE);
    }
}

fn attach(app: &mut App, paths: &str) {
    press(app, KeyCode::Char('o'), KeyModifiers::CONTROL);
    type_str(app, paths);
    press(app, KeyCode::Enter, KeyModifiers::NONE);
}

/// Render one frame and return the screen as text rows
fn screen(app: &mut App, terminal: &mut Terminal<TestBackend>) -> String {
    app.render(terminal).unwrap();
    let buffer = terminal.backend().buffer();
    let width = buffer.area.width as usize;
    buffer
        .content()
        .chunks(width)
        .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Message Exchange
// ============================================================================

#[test]
fn test_hello_round_trip_renders() {
    let mut app = app();
    let mut terminal = terminal();

    let before = screen(&mut app, &mut terminal);
    assert!(before.contains("Conversation with Bot"));
    assert!(before.contains("Write your message here"));

    type_str(&mut app, "hello");
    press(&mut app, KeyCode::Enter, KeyModifiers::NONE);

    let after = screen(&mut app, &mut terminal);
    assert!(after.contains("hello ●"));
    assert!(after.contains("◆ You said: hello"));
    assert_eq!(app.client().snapshot().messages.len(), 2);
}

#[test]
fn test_history_from_config_renders_first() {
    let mut config = ChatConfig::default();
    config.message_history = Some(chatkit_core::MessageHistory::Messages(vec![
        Message::bot("Welcome back"),
    ]));
    let store = ChatStore::new(ConversationState::with_messages(config.initial_messages()));
    let mut app = app_with(&config, store);

    let shown = screen(&mut app, &mut terminal());
    assert!(shown.contains("◆ Welcome back"));
}

// ============================================================================
// Attachments
// ============================================================================

#[test]
fn test_six_files_rejected_with_notice() {
    let mut app = app();
    let mut terminal = terminal();

    attach(&mut app, "a.png b.png c.png d.png e.png f.png");

    assert!(app.client().pending().files.is_empty());
    let shown = screen(&mut app, &mut terminal);
    assert!(shown.contains("You can upload up to 5 files."));
}

#[test]
fn test_attached_images_get_widget_reply() {
    let mut app = app();
    let mut terminal = terminal();

    attach(&mut app, "/tmp/cat.png /tmp/dog.jpg");
    let strip = screen(&mut app, &mut terminal);
    assert!(strip.contains("[1] cat.png"));
    assert!(strip.contains("[2] dog.jpg"));

    press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
    let shown = screen(&mut app, &mut terminal);
    assert!(shown.contains("[image] cat.png"));
    assert!(shown.contains("Got 2 images."));
    assert!(shown.contains("• dog.jpg"));
    assert_eq!(app.client().previews().len(), 2);
}

// ============================================================================
// Robustness
// ============================================================================

#[test]
fn test_unknown_message_type_is_skipped() {
    let store = ChatStore::new(ConversationState::with_messages(vec![
        Message::custom("mystery"),
        Message::bot("still here"),
    ]));
    let mut app = app_with(&ChatConfig::default(), store);

    let shown = screen(&mut app, &mut terminal());
    assert!(shown.contains("still here"));
    assert!(!shown.contains("mystery"));
}

// ============================================================================
// Loading
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_reply_shows_loading_then_text() {
    let mut app = app();
    let mut terminal = terminal();

    type_str(&mut app, "ping");
    press(&mut app, KeyCode::Enter, KeyModifiers::NONE);

    let loading = screen(&mut app, &mut terminal);
    assert!(loading.contains("◆ ..."));
    assert!(app.client().snapshot().is_input_disabled);

    tokio::time::sleep(REPLY_DELAY * 2).await;
    let done = screen(&mut app, &mut terminal);
    assert!(done.contains("◆ You said: ping"));
    assert!(!app.client().snapshot().is_input_disabled);
}
