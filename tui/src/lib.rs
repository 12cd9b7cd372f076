//! chatkit TUI - Terminal surface for chatkit conversations
//!
//! This crate renders a [`chatkit_core`] conversation full-screen: header,
//! scrollable transcript with avatars and widgets, a pending attachment
//! strip, and an input box with attach and send controls.
//!
//! # Architecture
//!
//! - **App**: Event loop and layout, a thin client over the conductor
//! - **Display**: Classifies each message and renders its visual branch
//! - **Widgets**: Named message widgets and the transcript view
//! - **Custom**: Custom message renderers and component hooks
//! - **Theme**: Colors, overridable per element from config
//! - **Demo**: The collaborators the bundled binary runs with

pub mod app;
pub mod conductor_client;
pub mod custom;
pub mod demo;
pub mod display;
pub mod theme;
pub mod widgets;

pub use app::App;
