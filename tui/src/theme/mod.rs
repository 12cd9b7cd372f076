//! Theme and Colors
//!
//! The default chat palette plus the mapping from configured
//! [`CustomStyles`] to ratatui styles.

use std::str::FromStr;

use ratatui::style::{Color, Modifier, Style};

use chatkit_core::{CustomStyles, ElementStyle};

// ============================================================================
// Chat Palette
// ============================================================================

/// Bot accent (avatar glyph, bubble text)
pub const BOT_ACCENT: Color = Color::Rgb(150, 180, 255);

/// User text green
pub const USER_GREEN: Color = Color::Rgb(130, 220, 130);

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Error red
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

/// Custom notice yellow
pub const NOTICE_YELLOW: Color = Color::Rgb(255, 223, 128);

/// Header bar background
pub const HEADER_BG: Color = Color::Rgb(40, 40, 60);

/// Scroll fade at the transcript edges
pub const FADE_FAR: Color = Color::Rgb(80, 80, 80);

/// Scroll fade, one row in
pub const FADE_NEAR: Color = Color::Rgb(120, 120, 120);

// ============================================================================
// Resolved Styles
// ============================================================================

/// Styles for every themed region
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Theme {
    /// Header bar
    pub header: Style,
    /// Text input
    pub input: Style,
    /// Send button label
    pub send_button: Style,
    /// Send button while input is disabled
    pub send_button_disabled: Style,
    /// Bot bubble text
    pub bot_message: Style,
    /// User bubble text
    pub user_message: Style,
    /// Placeholder and hints
    pub dim: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            header: Style::default().fg(Color::White).bg(HEADER_BG).add_modifier(Modifier::BOLD),
            input: Style::default().fg(USER_GREEN),
            send_button: Style::default().fg(BOT_ACCENT).add_modifier(Modifier::BOLD),
            send_button_disabled: Style::default().fg(DIM_GRAY),
            bot_message: Style::default().fg(BOT_ACCENT),
            user_message: Style::default().fg(USER_GREEN),
            dim: Style::default().fg(DIM_GRAY),
        }
    }
}

impl Theme {
    /// Default theme with configured overrides layered on top
    #[must_use]
    pub fn from_styles(styles: &CustomStyles) -> Self {
        let base = Self::default();
        Self {
            header: patch(base.header, &styles.header),
            input: patch(base.input, &styles.input),
            send_button: patch(base.send_button, &styles.send_button),
            bot_message: patch(base.bot_message, &styles.bot_message_box),
            ..base
        }
    }
}

/// Parse `#rrggbb` or a colour name
#[must_use]
pub fn parse_color(value: &str) -> Option<Color> {
    Color::from_str(value).ok()
}

fn patch(mut style: Style, element: &ElementStyle) -> Style {
    if let Some(bg) = element.background.as_deref().and_then(parse_color) {
        style = style.bg(bg);
    }
    if let Some(fg) = element.foreground.as_deref().and_then(parse_color) {
        style = style.fg(fg);
    }
    style
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#ff0000"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(parse_color("blue"), Some(Color::Blue));
        assert_eq!(parse_color("not-a-colour"), None);
    }

    #[test]
    fn test_overrides_layer_on_defaults() {
        let styles = CustomStyles {
            bot_message_box: ElementStyle {
                background: Some("#102030".to_string()),
                foreground: None,
            },
            ..CustomStyles::default()
        };
        let theme = Theme::from_styles(&styles);
        let base = Theme::default();

        assert_eq!(theme.bot_message.bg, Some(Color::Rgb(16, 32, 48)));
        assert_eq!(theme.bot_message.fg, base.bot_message.fg);
        assert_eq!(theme.header, base.header);
    }
}
