//! Conversation Messages
//!
//! The message record shared by every part of the pipeline. A message is
//! appended to the conversation store once and is afterwards only touched by
//! the asynchronous bot-response path (`loading` flips to false, `text` is
//! filled in).
//!
//! # Wire shape
//!
//! Messages serialize with a raw `type` tag so that a structured message
//! history can be seeded from the configuration file:
//!
//! ```toml
//! [[message_history]]
//! type = "bot"
//! text = "Welcome back!"
//! widget = "calendar"
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::attachments::FileRef;

/// Unique message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The raw `type` tag carried by a message
///
/// `Custom` holds any tag other than `"bot"` and `"user"`. Whether a custom
/// tag is actually renderable is decided by the classifier against the set of
/// registered custom message renderers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// Authored by the conversational agent
    Bot,
    /// Authored by the human participant
    User,
    /// Application-defined tag
    Custom(String),
}

impl MessageType {
    /// The raw tag string
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bot => "bot",
            Self::User => "user",
            Self::Custom(tag) => tag,
        }
    }
}

impl From<&str> for MessageType {
    fn from(tag: &str) -> Self {
        match tag {
            "bot" => Self::Bot,
            "user" => Self::User,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for MessageType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "bot" => Self::Bot,
            "user" => Self::User,
            _ => Self::Custom(tag),
        }
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Custom(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transcript entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID, also the render key
    #[serde(default)]
    pub id: MessageId,
    /// Raw type tag
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Message text
    #[serde(default, alias = "message")]
    pub text: String,
    /// Files attached by the user (user messages only in practice)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<FileRef>,
    /// Name of a widget to render alongside the bubble
    #[serde(
        default,
        alias = "widget_name",
        alias = "widgetName",
        skip_serializing_if = "Option::is_none"
    )]
    pub widget: Option<String>,
    /// Opaque data handed to widgets and custom renderers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Bot reply still being produced
    #[serde(default)]
    pub loading: bool,
    /// Explicit avatar override; wins over the computed grouping rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_avatar: Option<bool>,
}

impl Message {
    /// Create a message of the given type with no extras
    pub fn new(kind: impl Into<MessageType>, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            kind: kind.into(),
            text: text.into(),
            attachments: Vec::new(),
            widget: None,
            payload: None,
            loading: false,
            with_avatar: None,
        }
    }

    /// Create a bot message
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(MessageType::Bot, text)
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageType::User, text)
    }

    /// Create a message with an application-defined tag
    pub fn custom(tag: impl Into<String>) -> Self {
        Self::new(MessageType::Custom(tag.into()), String::new())
    }

    /// Attach a widget by name
    #[must_use]
    pub fn with_widget(mut self, name: impl Into<String>) -> Self {
        self.widget = Some(name.into());
        self
    }

    /// Attach an opaque payload
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Mark the message as still loading
    #[must_use]
    pub fn loading(mut self) -> Self {
        self.loading = true;
        self
    }

    /// Force avatar visibility for this message
    #[must_use]
    pub fn with_avatar(mut self, visible: bool) -> Self {
        self.with_avatar = Some(visible);
        self
    }

    /// Attach files
    #[must_use]
    pub fn with_attachments(mut self, files: Vec<FileRef>) -> Self {
        self.attachments = files;
        self
    }

    /// Whether any files are attached
    #[must_use]
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

/// Build a chat message the way submissions and informational notices do
///
/// `files` of `None` or an empty list yields a message without attachments.
pub fn create_chat_message(
    text: impl Into<String>,
    kind: impl Into<MessageType>,
    files: Option<Vec<FileRef>>,
) -> Message {
    Message::new(kind, text).with_attachments(files.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_id_unique() {
        let a = MessageId::new();
        let b = MessageId::new();
        assert_ne!(a, b);
        assert!(a.0.starts_with("msg_"));
    }

    #[test]
    fn test_message_type_from_tag() {
        assert_eq!(MessageType::from("bot"), MessageType::Bot);
        assert_eq!(MessageType::from("user"), MessageType::User);
        assert_eq!(
            MessageType::from("notice"),
            MessageType::Custom("notice".to_string())
        );
        assert_eq!(MessageType::Custom("notice".into()).as_str(), "notice");
    }

    #[test]
    fn test_create_chat_message_without_files() {
        let msg = create_chat_message("hi", MessageType::User, None);
        assert_eq!(msg.kind, MessageType::User);
        assert_eq!(msg.text, "hi");
        assert!(!msg.has_attachments());
        assert!(!msg.loading);
        assert_eq!(msg.with_avatar, None);
    }

    #[test]
    fn test_builder_helpers() {
        let msg = Message::bot("pick a date")
            .with_widget("calendar")
            .with_payload(serde_json::json!({"month": 3}))
            .loading()
            .with_avatar(false);
        assert_eq!(msg.widget.as_deref(), Some("calendar"));
        assert_eq!(msg.payload, Some(serde_json::json!({"month": 3})));
        assert!(msg.loading);
        assert_eq!(msg.with_avatar, Some(false));
    }

    #[test]
    fn test_deserialize_with_raw_type_tag() {
        let json = r#"{"type":"notice","message":"maintenance at 5pm","widgetName":"x"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind, MessageType::Custom("notice".to_string()));
        assert_eq!(msg.text, "maintenance at 5pm");
        assert_eq!(msg.widget.as_deref(), Some("x"));
        assert!(msg.id.0.starts_with("msg_"));
    }

    #[test]
    fn test_serialize_type_as_string() {
        let msg = Message::bot("hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "bot");
        assert_eq!(value["text"], "hello");
        assert!(value.get("attachments").is_none());
    }
}
