//! Conversation Store
//!
//! The single source of truth for a mounted conversation. Conversation State
//! and Pending Input live behind one lock so that "append the submitted
//! message and clear the input" is a single transition: a reader sees either
//! both effects or neither.
//!
//! Every transition bumps a version counter published on a
//! [`tokio::sync::watch`] channel. Surfaces subscribe to it to re-render and
//! to re-anchor the transcript scroll.
//!
//! The store is cheap to clone; clones share state. Parsers and action
//! providers hold a clone to post bot replies later.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::attachments::FileRef;
use crate::messages::{Message, MessageId};

/// Conversation state visible to renderers and widgets
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Transcript in append order
    pub messages: Vec<Message>,
    /// Text input and submission are locked
    pub is_input_disabled: bool,
    /// File picking and removal are locked
    pub is_file_input_disabled: bool,
}

impl ConversationState {
    /// State seeded with an initial transcript
    #[must_use]
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Find a message by ID
    #[must_use]
    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Append `message`, reassigning its ID if already taken
    ///
    /// Every path that adds to the transcript goes through here so render
    /// keys stay unique. Returns the ID the message was stored under.
    pub(crate) fn push_message(&mut self, mut message: Message) -> MessageId {
        if self.message(&message.id).is_some() {
            let original = message.id.clone();
            while self.message(&message.id).is_some() {
                message.id = MessageId::new();
            }
            tracing::warn!(
                duplicate = %original,
                replacement = %message.id,
                "Message ID already in transcript, reassigning"
            );
        }
        tracing::debug!(id = %message.id, kind = %message.kind, "Appended message");
        let id = message.id.clone();
        self.messages.push(message);
        id
    }
}

/// Not-yet-submitted text and file selection
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingInput {
    /// Text typed so far
    pub text: String,
    /// Picked files, at most [`crate::attachments::MAX_ATTACHMENTS`]
    pub files: Vec<FileRef>,
}

impl PendingInput {
    /// Whether anything has been typed or picked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.files.is_empty()
    }
}

/// Everything the store guards
#[derive(Clone, Debug, Default)]
pub struct ChatState {
    /// Conversation state
    pub conversation: ConversationState,
    /// Pending input
    pub pending: PendingInput,
}

/// Shared handle to the conversation
#[derive(Clone, Debug)]
pub struct ChatStore {
    inner: Arc<RwLock<ChatState>>,
    changes: Arc<watch::Sender<u64>>,
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new(ConversationState::default())
    }
}

impl ChatStore {
    /// Create a store around an initial conversation state
    ///
    /// Seeded messages with repeated IDs are re-keyed, keeping their order.
    #[must_use]
    pub fn new(initial: ConversationState) -> Self {
        let ConversationState {
            messages,
            is_input_disabled,
            is_file_input_disabled,
        } = initial;
        let mut conversation = ConversationState {
            messages: Vec::with_capacity(messages.len()),
            is_input_disabled,
            is_file_input_disabled,
        };
        for message in messages {
            conversation.push_message(message);
        }

        let (tx, _rx) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(ChatState {
                conversation,
                pending: PendingInput::default(),
            })),
            changes: Arc::new(tx),
        }
    }

    /// Clone of the current conversation state
    #[must_use]
    pub fn snapshot(&self) -> ConversationState {
        self.inner.read().conversation.clone()
    }

    /// Clone of the current pending input
    #[must_use]
    pub fn pending(&self) -> PendingInput {
        self.inner.read().pending.clone()
    }

    /// Read under the lock without cloning
    pub fn read<R>(&self, f: impl FnOnce(&ChatState) -> R) -> R {
        f(&self.inner.read())
    }

    /// Current version; bumps on every transition
    #[must_use]
    pub fn version(&self) -> u64 {
        *self.changes.borrow()
    }

    /// Subscribe to change notifications
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Apply one atomic transition and notify subscribers
    ///
    /// The lock is released before subscribers are notified.
    pub(crate) fn transition<R>(&self, f: impl FnOnce(&mut ChatState) -> R) -> R {
        let result = {
            let mut state = self.inner.write();
            f(&mut state)
        };
        self.changes.send_modify(|version| *version += 1);
        result
    }

    /// Like [`Self::transition`], but an `Err` leaves the version untouched
    ///
    /// `f` must not mutate the state before returning `Err`.
    pub(crate) fn try_transition<R, E>(
        &self,
        f: impl FnOnce(&mut ChatState) -> Result<R, E>,
    ) -> Result<R, E> {
        let result = {
            let mut state = self.inner.write();
            f(&mut state)
        };
        if result.is_ok() {
            self.changes.send_modify(|version| *version += 1);
        }
        result
    }

    // ========================================================================
    // Conversation Transitions
    // ========================================================================

    /// Append a message to the transcript
    ///
    /// A message whose ID is already present gets a fresh ID so render keys
    /// stay unique. Returns the ID the message was stored under.
    pub fn append_message(&self, message: Message) -> MessageId {
        self.transition(|state| state.conversation.push_message(message))
    }

    /// Update a message in place (bot replies filling in later)
    ///
    /// The message keeps its ID and position. Returns `false` when no message
    /// has that ID.
    pub fn update_message(&self, id: &MessageId, f: impl FnOnce(&mut Message)) -> bool {
        self.transition(|state| {
            let Some(message) = state.conversation.messages.iter_mut().find(|m| &m.id == id) else {
                tracing::warn!(%id, "Update for unknown message ignored");
                return false;
            };
            f(message);
            message.id = id.clone();
            true
        })
    }

    /// Lock or unlock text input and submission
    pub fn set_input_disabled(&self, disabled: bool) {
        self.transition(|state| state.conversation.is_input_disabled = disabled);
    }

    /// Lock or unlock file picking
    pub fn set_file_input_disabled(&self, disabled: bool) {
        self.transition(|state| state.conversation.is_file_input_disabled = disabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_append_preserves_order() {
        let store = ChatStore::default();
        let a = store.append_message(Message::bot("one"));
        let b = store.append_message(Message::user("two"));
        let c = store.append_message(Message::bot("three"));

        let ids: Vec<_> = store.snapshot().messages.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn test_duplicate_id_is_reassigned() {
        let store = ChatStore::default();
        let msg = Message::bot("one");
        let first = store.append_message(msg.clone());
        let second = store.append_message(msg);
        assert_ne!(first, second);
        assert_eq!(store.snapshot().messages.len(), 2);
    }

    #[test]
    fn test_update_message_fills_in_reply() {
        let store = ChatStore::default();
        let id = store.append_message(Message::bot("").loading());

        assert!(store.update_message(&id, |m| {
            m.text = "done".to_string();
            m.loading = false;
            m.id = MessageId::new();
        }));

        let state = store.snapshot();
        let msg = state.message(&id).unwrap();
        assert_eq!(msg.text, "done");
        assert!(!msg.loading);
    }

    #[test]
    fn test_update_unknown_message() {
        let store = ChatStore::default();
        assert!(!store.update_message(&MessageId::new(), |m| m.text.clear()));
    }

    #[test]
    fn test_every_transition_bumps_version() {
        let store = ChatStore::default();
        let rx = store.subscribe();
        assert_eq!(store.version(), 0);

        store.append_message(Message::bot("hi"));
        store.set_input_disabled(true);
        store.set_file_input_disabled(true);

        assert_eq!(store.version(), 3);
        assert_eq!(*rx.borrow(), 3);
        let state = store.snapshot();
        assert!(state.is_input_disabled);
        assert!(state.is_file_input_disabled);
    }

    #[test]
    fn test_clones_share_state() {
        let store = ChatStore::default();
        let handle = store.clone();
        handle.append_message(Message::bot("from a parser"));
        assert_eq!(store.snapshot().messages.len(), 1);
    }

    #[test]
    fn test_subscriber_wakes_on_transition() {
        let store = ChatStore::default();
        let mut rx = store.subscribe();
        let mut changed = tokio_test::task::spawn(rx.changed());
        tokio_test::assert_pending!(changed.poll());

        store.set_input_disabled(true);
        assert!(changed.is_woken());
        tokio_test::assert_ready_ok!(changed.poll());
    }

    #[test]
    fn test_seeded_duplicates_are_rekeyed() {
        let first = Message::bot("one");
        let mut second = Message::bot("two");
        second.id = first.id.clone();

        let store = ChatStore::new(ConversationState::with_messages(vec![first.clone(), second]));
        let state = store.snapshot();
        assert_eq!(state.messages[0].id, first.id);
        assert_ne!(state.messages[1].id, first.id);
        assert_eq!(state.messages[1].text, "two");
    }

    #[test]
    fn test_reassigned_id_skips_taken_ids() {
        // Seed the IDs the counter is about to hand out
        let next = MessageId::new().0;
        let n: u64 = next.trim_start_matches("msg_").parse().unwrap();
        let seeded: Vec<Message> = (n + 1..n + 4)
            .map(|i| {
                let mut m = Message::bot(format!("seed {i}"));
                m.id = MessageId(format!("msg_{i}"));
                m
            })
            .collect();
        let store = ChatStore::new(ConversationState::with_messages(seeded));

        let mut clash = Message::user("new");
        clash.id = MessageId(format!("msg_{}", n + 1));
        store.append_message(clash);

        let ids: std::collections::HashSet<_> =
            store.snapshot().messages.into_iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_failed_try_transition_keeps_version() {
        let store = ChatStore::default();
        let result: Result<(), &str> = store.try_transition(|_| Err("nope"));
        assert_eq!(result, Err("nope"));
        assert_eq!(store.version(), 0);

        let result: Result<u8, &str> = store.try_transition(|_| Ok(1));
        assert_eq!(result, Ok(1));
        assert_eq!(store.version(), 1);
    }
}
