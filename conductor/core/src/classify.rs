//! Message Classification
//!
//! Resolves a message's raw `type` tag into a [`MessageClass`] once per
//! message, so render sites dispatch on a closed set of variants instead of
//! re-inspecting strings.

use std::collections::{BTreeSet, HashSet};

use thiserror::Error;

use crate::messages::{Message, MessageId, MessageType};

/// The visual branch a message renders through
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageClass<'a> {
    /// Bot bubble
    Bot,
    /// User bubble
    User,
    /// Application-defined renderer, keyed by tag
    Custom(&'a str),
}

/// A message whose type tag matches no branch
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("message {id} has unrecognised type `{tag}`")]
pub struct UnknownMessageType {
    /// Offending message
    pub id: MessageId,
    /// Its raw tag
    pub tag: String,
}

/// The set of custom message tags with a registered renderer
pub trait CustomTags {
    /// Whether `tag` has a renderer
    fn contains_tag(&self, tag: &str) -> bool;
}

/// No custom messages registered
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCustomTags;

impl CustomTags for NoCustomTags {
    fn contains_tag(&self, _tag: &str) -> bool {
        false
    }
}

impl CustomTags for HashSet<String> {
    fn contains_tag(&self, tag: &str) -> bool {
        self.contains(tag)
    }
}

impl CustomTags for BTreeSet<String> {
    fn contains_tag(&self, tag: &str) -> bool {
        self.contains(tag)
    }
}

impl CustomTags for [&str] {
    fn contains_tag(&self, tag: &str) -> bool {
        self.contains(&tag)
    }
}

/// Classify one message
///
/// # Errors
///
/// Returns [`UnknownMessageType`] when the tag is neither `bot`, `user`, nor a
/// registered custom tag.
pub fn classify<'a, T>(message: &'a Message, tags: &T) -> Result<MessageClass<'a>, UnknownMessageType>
where
    T: CustomTags + ?Sized,
{
    match &message.kind {
        MessageType::Bot => Ok(MessageClass::Bot),
        MessageType::User => Ok(MessageClass::User),
        MessageType::Custom(tag) if tags.contains_tag(tag) => Ok(MessageClass::Custom(tag.as_str())),
        MessageType::Custom(tag) => Err(UnknownMessageType {
            id: message.id.clone(),
            tag: tag.clone(),
        }),
    }
}

/// Whether the message was authored by the bot
#[must_use]
pub fn is_bot_message(message: &Message) -> bool {
    message.kind == MessageType::Bot
}

/// Whether the message was authored by the user
#[must_use]
pub fn is_user_message(message: &Message) -> bool {
    message.kind == MessageType::User
}

/// Whether the message carries a registered custom tag
#[must_use]
pub fn is_custom_message<T: CustomTags + ?Sized>(message: &Message, tags: &T) -> bool {
    matches!(&message.kind, MessageType::Custom(tag) if tags.contains_tag(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_builtin_types() {
        let bot = Message::bot("hi");
        let user = Message::user("hello");
        assert_eq!(classify(&bot, &NoCustomTags), Ok(MessageClass::Bot));
        assert_eq!(classify(&user, &NoCustomTags), Ok(MessageClass::User));
        assert!(is_bot_message(&bot));
        assert!(is_user_message(&user));
        assert!(!is_user_message(&bot));
    }

    #[test]
    fn test_classify_registered_custom_tag() {
        let tags: HashSet<String> = ["notice".to_string()].into_iter().collect();
        let msg = Message::custom("notice");
        assert_eq!(classify(&msg, &tags), Ok(MessageClass::Custom("notice")));
        assert!(is_custom_message(&msg, &tags));
    }

    #[test]
    fn test_classify_unregistered_tag_is_error() {
        let msg = Message::custom("mystery");
        let err = classify(&msg, &["notice"][..]).unwrap_err();
        assert_eq!(err.tag, "mystery");
        assert_eq!(err.id, msg.id);
        assert!(!is_custom_message(&msg, &NoCustomTags));
    }

    #[test]
    fn test_builtin_tags_win_over_custom_registry() {
        // A custom registry that claims "bot" must not change how bot messages classify
        let tags: BTreeSet<String> = ["bot".to_string()].into_iter().collect();
        assert_eq!(classify(&Message::bot("x"), &tags), Ok(MessageClass::Bot));
    }
}
