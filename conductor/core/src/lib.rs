//! Chatkit Core - Headless Conversation Engine
//!
//! This crate holds everything a chat surface needs that is not drawing:
//! the transcript store, message classification, the attachment selection
//! and its preview URLs, the submission state machine, and scroll
//! scheduling. It can drive a terminal UI or run headless for tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Chat Surface                              │
//! │   transcript render ◀── classify() ◀── ConversationState          │
//! │   attachment strip  ◀── PreviewCache::sync() (once per frame)     │
//! │   input keys ───────────────┐                                     │
//! └─────────────────────────────┼────────────────────────────────────┘
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         CHATKIT CORE                              │
//! │  ┌──────────────┐   ┌──────────────┐   ┌───────────────────────┐  │
//! │  │  Conductor   │──▶│  ChatStore   │──▶│ watch (version bump)  │  │
//! │  │ submit/files │   │ conversation │   └───────────────────────┘  │
//! │  └──────┬───────┘   │ + pending    │                              │
//! │         │           └──────────────┘                              │
//! │         ├──▶ MessageParser (bot replies)                          │
//! │         └──▶ ScrollCoordinator (deferred bottom jump)             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Conductor`]: submission state machine and file selection
//! - [`ChatStore`]: shared conversation state with atomic transitions
//! - [`Message`]: a transcript entry with a raw `type` tag
//! - [`MessageClass`]: the render branch a message resolves to
//! - [`PreviewCache`]: per-frame preview URL reconciliation
//! - [`ScrollCoordinator`]: cancellable deferred scroll jumps
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatkit_core::{ChatStore, Conductor, FnParser, Message};
//!
//! let store = ChatStore::default();
//! let replies = store.clone();
//! let parser = FnParser(move |text: &str, _files: Option<&[chatkit_core::FileRef]>| {
//!     replies.append_message(Message::bot(format!("You said: {text}")));
//! });
//!
//! let conductor = Conductor::new(store, Arc::new(parser))
//!     .with_validator(|text| !text.trim().is_empty());
//! conductor.set_text("hello");
//! conductor.submit();
//! ```
//!
//! # Module Overview
//!
//! - [`actions`]: opaque action provider and named action callbacks
//! - [`attachments`]: file selection rules and preview URL lifetimes
//! - [`classify`]: message type tag to render branch
//! - [`conductor`]: submission state machine
//! - [`config`]: TOML configuration with env and CLI overrides
//! - [`messages`]: the message record
//! - [`scroll`]: viewport and deferred scroll anchoring
//! - [`store`]: conversation state container
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod attachments;
pub mod classify;
pub mod conductor;
pub mod config;
pub mod messages;
pub mod scroll;
pub mod store;

// Re-exports for convenience
pub use actions::{ActionFn, ActionProvider, Actions, NoActions};
pub use attachments::{
    add_files, remove_file, AttachmentError, AttachmentManager, FileId, FileRef, ObjectUrlRegistry,
    PreviewBackend, PreviewCache, PreviewSync, PreviewUrl, ACCEPTED_EXTENSIONS, MAX_ATTACHMENTS,
};
pub use classify::{
    classify, is_bot_message, is_custom_message, is_user_message, CustomTags, MessageClass,
    NoCustomTags, UnknownMessageType,
};
pub use conductor::{
    AddFilesOutcome, Conductor, DropReason, FnParser, InputPhase, MessageParser, SubmitOutcome,
    Validator,
};
pub use messages::{create_chat_message, Message, MessageId, MessageType};
pub use scroll::{ScrollCoordinator, ScrollTrigger, SharedViewport, Viewport, SCROLL_SETTLE_DELAY};
pub use store::{ChatState, ChatStore, ConversationState, PendingInput};

// Config exports
pub use config::{
    default_config_path, is_valid_color, load_config, load_config_from_path, load_config_with_env,
    ChatConfig, ChatToml, ConfigError, ConfigOverrides, ConfigSource, CustomStyles, ElementStyle,
    MessageHistory,
};
