//! TOML Configuration File Support
//!
//! Loads the chat configuration from `~/.config/chatkit/chatkit.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables (`CHATKIT_BOT_NAME`, `CHATKIT_DISABLE_SCROLL`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! bot_name = "Ada"
//! header_text = "Support chat"
//! placeholder_text = "Ask anything"
//! disable_scroll_to_bottom = false
//!
//! [custom_styles.header]
//! background = "#1e1e2e"
//! foreground = "white"
//!
//! [custom_styles.bot_message_box]
//! background = "blue"
//!
//! [[message_history]]
//! type = "bot"
//! text = "Welcome back!"
//! ```
//!
//! `message_history` may instead be a single pre-rendered string, shown above
//! the live transcript:
//!
//! ```toml
//! message_history = "Earlier: you asked about refunds."
//! ```

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::Message;

/// Bot name used when none is configured
pub const DEFAULT_BOT_NAME: &str = "Bot";

/// Input placeholder used when none is configured
pub const DEFAULT_PLACEHOLDER: &str = "Write your message here";

/// Colour names accepted in style sections, besides `#rrggbb`
const NAMED_COLORS: &[&str] = &[
    "reset",
    "black",
    "red",
    "green",
    "yellow",
    "blue",
    "magenta",
    "cyan",
    "gray",
    "grey",
    "darkgray",
    "darkgrey",
    "lightred",
    "lightgreen",
    "lightyellow",
    "lightblue",
    "lightmagenta",
    "lightcyan",
    "white",
];

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Colours for one styled element
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementStyle {
    /// Background colour (`#rrggbb` or a colour name)
    pub background: Option<String>,
    /// Foreground colour (`#rrggbb` or a colour name)
    pub foreground: Option<String>,
}

impl ElementStyle {
    fn colors(&self) -> impl Iterator<Item = &str> {
        self.background.iter().chain(self.foreground.iter()).map(String::as_str)
    }
}

/// Per-element style overrides
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomStyles {
    /// Header bar
    pub header: ElementStyle,
    /// Text input
    pub input: ElementStyle,
    /// Send button
    pub send_button: ElementStyle,
    /// Bot message bubble
    pub bot_message_box: ElementStyle,
}

impl CustomStyles {
    fn elements(&self) -> [(&'static str, &ElementStyle); 4] {
        [
            ("header", &self.header),
            ("input", &self.input),
            ("send_button", &self.send_button),
            ("bot_message_box", &self.bot_message_box),
        ]
    }
}

/// Conversation history to show on mount
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageHistory {
    /// Pre-rendered text shown above the transcript
    Rendered(String),
    /// Messages seeded into the store
    Messages(Vec<Message>),
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Display name of the bot
    pub bot_name: Option<String>,

    /// Header bar text
    pub header_text: Option<String>,

    /// Input placeholder
    pub placeholder_text: Option<String>,

    /// Turn off automatic scroll anchoring
    pub disable_scroll_to_bottom: Option<bool>,

    /// Style overrides
    pub custom_styles: Option<CustomStyles>,

    /// Initial history
    pub message_history: Option<MessageHistory>,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved chat configuration
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Display name of the bot
    pub bot_name: String,

    /// Explicit header text; `None` derives it from the bot name
    pub header_text: Option<String>,

    /// Input placeholder
    pub placeholder_text: String,

    /// Turn off automatic scroll anchoring
    pub disable_scroll_to_bottom: bool,

    /// Style overrides
    pub custom_styles: CustomStyles,

    /// Initial history
    pub message_history: Option<MessageHistory>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            bot_name: DEFAULT_BOT_NAME.to_string(),
            header_text: None,
            placeholder_text: DEFAULT_PLACEHOLDER.to_string(),
            disable_scroll_to_bottom: false,
            custom_styles: CustomStyles::default(),
            message_history: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ChatConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Header text, defaulting to "Conversation with {bot_name}"
    #[must_use]
    pub fn header(&self) -> String {
        self.header_text
            .clone()
            .unwrap_or_else(|| format!("Conversation with {}", self.bot_name))
    }

    /// Messages to seed the store with
    #[must_use]
    pub fn initial_messages(&self) -> Vec<Message> {
        match &self.message_history {
            Some(MessageHistory::Messages(messages)) => messages.clone(),
            _ => Vec::new(),
        }
    }

    /// Pre-rendered history text, if configured that way
    #[must_use]
    pub fn rendered_history(&self) -> Option<&str> {
        match &self.message_history {
            Some(MessageHistory::Rendered(text)) => Some(text),
            _ => None,
        }
    }

    /// Check invariants that the TOML schema cannot express
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for an empty bot name, an
    /// unparseable colour, or duplicate message IDs in the history.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_name.trim().is_empty() {
            return Err(ConfigError::ValidationError("bot_name must not be empty".to_string()));
        }

        for (element, style) in self.custom_styles.elements() {
            if let Some(bad) = style.colors().find(|c| !is_valid_color(c)) {
                return Err(ConfigError::ValidationError(format!(
                    "custom_styles.{element}: `{bad}` is not a colour"
                )));
            }
        }

        if let Some(MessageHistory::Messages(messages)) = &self.message_history {
            let mut seen = HashSet::new();
            if let Some(dup) = messages.iter().find(|m| !seen.insert(&m.id)) {
                return Err(ConfigError::ValidationError(format!(
                    "message_history has duplicate id `{}`",
                    dup.id
                )));
            }
        }

        Ok(())
    }
}

/// Whether `value` is `#rrggbb` or a known colour name
#[must_use]
pub fn is_valid_color(value: &str) -> bool {
    if let Some(hex) = value.strip_prefix('#') {
        return hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    let normalized: String = value
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect();
    NAMED_COLORS.contains(&normalized.as_str())
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/chatkit/chatkit.toml` or
/// `~/.config/chatkit/chatkit.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("chatkit").join("chatkit.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed or fails
/// validation. A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<ChatConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then the process environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read, parsed, or
/// validated.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ChatConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an explicit environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<ChatConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ChatConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ChatToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ChatConfig, toml: ChatToml) {
    if let Some(name) = toml.bot_name {
        config.bot_name = name;
    }
    if toml.header_text.is_some() {
        config.header_text = toml.header_text;
    }
    if let Some(placeholder) = toml.placeholder_text {
        config.placeholder_text = placeholder;
    }
    if let Some(disabled) = toml.disable_scroll_to_bottom {
        config.disable_scroll_to_bottom = disabled;
    }
    if let Some(styles) = toml.custom_styles {
        config.custom_styles = styles;
    }
    if toml.message_history.is_some() {
        config.message_history = toml.message_history;
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut ChatConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = env("CHATKIT_BOT_NAME") {
        config.bot_name = name;
        config.source = ConfigSource::Env;
    }
    if let Some(disabled) = env("CHATKIT_DISABLE_SCROLL") {
        config.disable_scroll_to_bottom = disabled != "0" && disabled.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Bot name override
    pub bot_name: Option<String>,

    /// Scroll anchoring override
    pub disable_scroll_to_bottom: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bot name override
    #[must_use]
    pub fn with_bot_name(mut self, name: String) -> Self {
        self.bot_name = Some(name);
        self
    }

    /// Set scroll anchoring override
    #[must_use]
    pub fn with_disable_scroll(mut self, disabled: bool) -> Self {
        self.disable_scroll_to_bottom = Some(disabled);
        self
    }

    /// Apply overrides to a configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override breaks a
    /// configuration invariant.
    pub fn apply(&self, config: &mut ChatConfig) -> Result<(), ConfigError> {
        if self.bot_name.is_some() || self.disable_scroll_to_bottom.is_some() {
            config.source = ConfigSource::Cli;
        }
        if let Some(ref name) = self.bot_name {
            config.bot_name = name.clone();
        }
        if let Some(disabled) = self.disable_scroll_to_bottom {
            config.disable_scroll_to_bottom = disabled;
        }
        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageType;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    // =========================================================================
    // Default Configuration Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = ChatConfig::default();

        assert_eq!(config.bot_name, "Bot");
        assert_eq!(config.header(), "Conversation with Bot");
        assert_eq!(config.placeholder_text, "Write your message here");
        assert!(!config.disable_scroll_to_bottom);
        assert!(config.initial_messages().is_empty());
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("chatkit/chatkit.toml"));
        }
    }

    // =========================================================================
    // TOML Loading Tests
    // =========================================================================

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            load_config_with_env(Some(PathBuf::from("/nonexistent/chatkit.toml")), no_env).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            r##"
bot_name = "Ada"
placeholder_text = "Ask anything"
disable_scroll_to_bottom = true

[custom_styles.header]
background = "#1e1e2e"
foreground = "white"

[[message_history]]
type = "bot"
text = "Welcome back!"

[[message_history]]
type = "notice"
payload = { level = "info" }
"##,
        );

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();

        assert_eq!(config.bot_name, "Ada");
        assert_eq!(config.header(), "Conversation with Ada");
        assert_eq!(config.placeholder_text, "Ask anything");
        assert!(config.disable_scroll_to_bottom);
        assert_eq!(config.custom_styles.header.background.as_deref(), Some("#1e1e2e"));
        assert_eq!(config.source(), ConfigSource::File);

        let history = config.initial_messages();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, MessageType::Bot);
        assert_eq!(history[1].kind, MessageType::Custom("notice".to_string()));
        assert_ne!(history[0].id, history[1].id);
        assert!(config.rendered_history().is_none());
    }

    #[test]
    fn test_rendered_history_string() {
        let file = write_config(r#"message_history = "Earlier: refunds""#);
        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.rendered_history(), Some("Earlier: refunds"));
        assert!(config.initial_messages().is_empty());
    }

    #[test]
    fn test_explicit_header_text_wins() {
        let file = write_config("bot_name = \"Ada\"\nheader_text = \"Support\"");
        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.header(), "Support");
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let file = write_config("bot_name = ");
        let err = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    // =========================================================================
    // Validation Tests
    // =========================================================================

    #[test]
    fn test_rejects_bad_colour() {
        let file = write_config("[custom_styles.send_button]\nbackground = \"#12345\"");
        let err = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap_err();
        let ConfigError::ValidationError(msg) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("send_button"));
    }

    #[test]
    fn test_rejects_duplicate_history_ids() {
        let file = write_config(
            r#"
[[message_history]]
id = "greeting"
type = "bot"
text = "hi"

[[message_history]]
id = "greeting"
type = "bot"
text = "hi again"
"#,
        );
        let err = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_colour_names() {
        assert!(is_valid_color("light-blue"));
        assert!(is_valid_color("DarkGray"));
        assert!(is_valid_color("#A0b1C2"));
        assert!(!is_valid_color("chartreuse"));
        assert!(!is_valid_color("#zzzzzz"));
    }

    // =========================================================================
    // Priority Tests
    // =========================================================================

    #[test]
    fn test_env_overrides_file() {
        let file = write_config("bot_name = \"Ada\"");
        let env = |key: &str| match key {
            "CHATKIT_BOT_NAME" => Some("Grace".to_string()),
            "CHATKIT_DISABLE_SCROLL" => Some("true".to_string()),
            _ => None,
        };
        let config = load_config_with_env(Some(file.path().to_path_buf()), env).unwrap();
        assert_eq!(config.bot_name, "Grace");
        assert!(config.disable_scroll_to_bottom);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_empty_env_bot_name_fails_validation() {
        let env = |key: &str| (key == "CHATKIT_BOT_NAME").then(String::new);
        let err = load_config_with_env(None, env).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = ChatConfig::default();
        ConfigOverrides::new()
            .with_bot_name("Cli".to_string())
            .with_disable_scroll(true)
            .apply(&mut config)
            .unwrap();
        assert_eq!(config.bot_name, "Cli");
        assert!(config.disable_scroll_to_bottom);
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_keep_source() {
        let mut config = ChatConfig::default();
        ConfigOverrides::new().apply(&mut config).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
    }
}
