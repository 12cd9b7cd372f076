//! chatkit TUI Entry Point
//!
//! Launches a terminal conversation with the demo echo bot.
//!
//! Usage:
//!   chatkit-tui [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>      Config file (default: ~/.config/chatkit/chatkit.toml)
//!   -b, --bot-name <NAME>    Bot display name
//!       --no-scroll          Don't pin the transcript to the newest message
//!   -l, --log-file <FILE>    Write logs here instead of stderr

use std::fs::File;
use std::io::{self, IsTerminal};
use std::panic;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatkit_core::{default_config_path, load_config_from_path, ChatStore, ConfigOverrides, ConversationState};
use chatkit_tui::{demo, App};

/// Terminal chat surface
#[derive(Parser, Debug)]
#[command(name = "chatkit-tui", version, about)]
struct Args {
    /// Config file path
    #[arg(short = 'c', long, env = "CHATKIT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bot display name
    #[arg(short = 'b', long, value_name = "NAME")]
    bot_name: Option<String>,

    /// Don't pin the transcript to the newest message
    #[arg(long)]
    no_scroll: bool,

    /// Log file (the terminal is taken by the UI)
    #[arg(short = 'l', long, env = "CHATKIT_LOG_FILE", value_name = "FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Set up logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    match &args.log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Arc::new(file)),
                )
                .init();
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(io::stderr))
            .init(),
    }

    // Load configuration
    let mut config = load_config_from_path(args.config.clone().or_else(default_config_path))?;
    let mut overrides = ConfigOverrides::new();
    if let Some(name) = args.bot_name.clone() {
        overrides = overrides.with_bot_name(name);
    }
    if args.no_scroll {
        overrides = overrides.with_disable_scroll(true);
    }
    overrides.apply(&mut config)?;
    tracing::info!(source = ?config.source(), bot = %config.bot_name, "Configuration loaded");

    // Check if we have a TTY before attempting initialization
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: chatkit-tui requires a terminal (TTY)");
        eprintln!();
        eprintln!("Run it interactively, or over SSH with -t.");
        std::process::exit(1);
    }

    let store = ChatStore::new(ConversationState::with_messages(config.initial_messages()));
    let kit = demo::collaborators(&config, &store)?;
    let mut app = App::new(&config, store, kit).with_validator(|text| !text.trim().is_empty());

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal before printing panic
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the app
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Propagate any errors
    result
}
