//! Conversation Conductor
//!
//! Owns the pending-input state machine and the submission path.
//!
//! # States
//!
//! ```text
//!            set_input_disabled(true)
//!   ┌──────┐ ───────────────────────▶ ┌──────────┐
//!   │ Idle │                          │ Disabled │
//!   └──────┘ ◀─────────────────────── └──────────┘
//!      │     set_input_disabled(false)
//!      │ submit()
//!      ▼
//!   validator(text) || files attached ──no──▶ dropped silently
//!      │ yes
//!      ▼
//!   append user message + clear pending (one transition)
//!      ▼
//!   scroll_to_bottom() ──▶ parser.parse(text, files)
//! ```
//!
//! The disabled state is driven by the embedding application (for example
//! while a bot reply streams in); the conductor only reads it.

use std::fmt;
use std::sync::Arc;

use crate::attachments::{self, AttachmentError, FileRef};
use crate::messages::{create_chat_message, Message, MessageId, MessageType};
use crate::scroll::ScrollTrigger;
use crate::store::{ChatStore, PendingInput};

/// Predicate deciding whether submitted text is acceptable
pub type Validator = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Receives every accepted submission
///
/// Implementations produce the bot's replies, usually by holding a
/// [`ChatStore`] clone and appending messages to it.
pub trait MessageParser: Send + Sync {
    /// Handle raw submitted text and files (`None` when nothing was attached)
    fn parse(&self, text: &str, files: Option<&[FileRef]>);
}

/// Adapts a closure into a [`MessageParser`]
pub struct FnParser<F>(pub F);

impl<F> MessageParser for FnParser<F>
where
    F: Fn(&str, Option<&[FileRef]>) + Send + Sync,
{
    fn parse(&self, text: &str, files: Option<&[FileRef]>) {
        (self.0)(text, files);
    }
}

/// Whether submissions are currently accepted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputPhase {
    /// Input enabled
    Idle,
    /// Input locked by the embedding application
    Disabled,
}

/// Why a submission was dropped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Input is disabled
    InputDisabled,
    /// Validator rejected the text and no files were attached
    Invalid,
}

/// Result of [`Conductor::submit`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A user message was appended under this ID
    Accepted(MessageId),
    /// Nothing changed
    Dropped(DropReason),
}

/// Result of [`Conductor::add_files`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddFilesOutcome {
    /// Files were appended to the selection
    Added {
        /// Selection size afterwards
        total: usize,
    },
    /// Selection unchanged; an informational bot message was appended
    Rejected(AttachmentError),
    /// File input is disabled; nothing changed
    Disabled,
}

/// The conversation orchestrator
pub struct Conductor {
    store: ChatStore,
    parser: Arc<dyn MessageParser>,
    validator: Option<Validator>,
    scroll: Option<Arc<dyn ScrollTrigger>>,
}

impl fmt::Debug for Conductor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conductor")
            .field("store", &self.store)
            .field("has_validator", &self.validator.is_some())
            .field("has_scroll", &self.scroll.is_some())
            .finish_non_exhaustive()
    }
}

impl Conductor {
    /// Create a conductor over `store` that forwards submissions to `parser`
    pub fn new(store: ChatStore, parser: Arc<dyn MessageParser>) -> Self {
        Self {
            store,
            parser,
            validator: None,
            scroll: None,
        }
    }

    /// Only accept text the validator approves (attachments bypass it)
    #[must_use]
    pub fn with_validator(mut self, validator: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Re-anchor the transcript after each accepted submission
    #[must_use]
    pub fn with_scroll(mut self, scroll: Arc<dyn ScrollTrigger>) -> Self {
        self.scroll = Some(scroll);
        self
    }

    /// The underlying store
    #[must_use]
    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    /// Current submission phase
    #[must_use]
    pub fn phase(&self) -> InputPhase {
        if self.store.read(|s| s.conversation.is_input_disabled) {
            InputPhase::Disabled
        } else {
            InputPhase::Idle
        }
    }

    /// Current pending input
    #[must_use]
    pub fn pending(&self) -> PendingInput {
        self.store.pending()
    }

    // ========================================================================
    // Text Input
    // ========================================================================

    /// Replace the pending text. Returns `false` while input is disabled.
    pub fn set_text(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        self.edit_text(|current| *current = text)
    }

    /// Append a typed character. Returns `false` while input is disabled.
    pub fn push_char(&self, c: char) -> bool {
        self.edit_text(|current| current.push(c))
    }

    /// Delete the last character. Returns `false` while input is disabled.
    pub fn pop_char(&self) -> bool {
        self.edit_text(|current| {
            current.pop();
        })
    }

    fn edit_text(&self, edit: impl FnOnce(&mut String)) -> bool {
        if self.phase() == InputPhase::Disabled {
            tracing::debug!("Ignoring text edit while input is disabled");
            return false;
        }
        self.store.transition(|state| edit(&mut state.pending.text));
        true
    }

    // ========================================================================
    // File Input
    // ========================================================================

    /// Add picked files to the pending selection
    ///
    /// A rejected pick leaves the selection untouched and appends one
    /// informational bot message explaining why.
    pub fn add_files(&self, files: Vec<FileRef>) -> AddFilesOutcome {
        if files.is_empty() {
            let total = self.store.read(|s| s.pending.files.len());
            return AddFilesOutcome::Added { total };
        }

        let outcome = self.store.transition(|state| {
            if state.conversation.is_file_input_disabled {
                return AddFilesOutcome::Disabled;
            }
            match attachments::add_files(&state.pending.files, &files) {
                Ok(merged) => {
                    state.pending.files = merged;
                    AddFilesOutcome::Added {
                        total: state.pending.files.len(),
                    }
                }
                Err(err) => {
                    if err.is_user_facing() {
                        state
                            .conversation
                            .push_message(create_chat_message(err.to_string(), MessageType::Bot, None));
                    }
                    AddFilesOutcome::Rejected(err)
                }
            }
        });

        match &outcome {
            AddFilesOutcome::Added { total } => {
                tracing::debug!(picked = files.len(), total, "Files attached");
            }
            AddFilesOutcome::Rejected(err) => {
                tracing::warn!(picked = files.len(), error = %err, "File selection rejected");
                self.request_scroll();
            }
            AddFilesOutcome::Disabled => {
                tracing::debug!("Ignoring file pick while file input is disabled");
            }
        }
        outcome
    }

    /// Remove the pending file at `index`
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::FileInputDisabled`] while file input is
    /// disabled, or [`AttachmentError::IndexOutOfRange`] for a bad index.
    pub fn remove_file(&self, index: usize) -> Result<FileRef, AttachmentError> {
        self.store.transition(|state| {
            if state.conversation.is_file_input_disabled {
                return Err(AttachmentError::FileInputDisabled);
            }
            let removed = state
                .pending
                .files
                .get(index)
                .cloned()
                .ok_or(AttachmentError::IndexOutOfRange {
                    index,
                    len: state.pending.files.len(),
                })?;
            state.pending.files = attachments::remove_file(&state.pending.files, index)?;
            tracing::debug!(index, name = %removed.name, "Removed pending file");
            Ok(removed)
        })
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Submit the pending input
    ///
    /// The phase check, validation, append and clear all happen under one
    /// write lock, against the same pending snapshot. The validator must not
    /// touch the store.
    pub fn submit(&self) -> SubmitOutcome {
        let validator = self.validator.as_deref();
        let committed = self.store.try_transition(|state| {
            if state.conversation.is_input_disabled {
                return Err(DropReason::InputDisabled);
            }
            if let Some(validator) = validator {
                let pending = &state.pending;
                if !validator(&pending.text) && pending.files.is_empty() {
                    return Err(DropReason::Invalid);
                }
            }
            let PendingInput { text, files } = std::mem::take(&mut state.pending);
            let message = create_chat_message(text.clone(), MessageType::User, Some(files.clone()));
            let id = state.conversation.push_message(message);
            Ok((id, text, files))
        });

        let (id, text, files) = match committed {
            Ok(committed) => committed,
            Err(reason) => {
                tracing::debug!(?reason, "Submission dropped");
                return SubmitOutcome::Dropped(reason);
            }
        };
        tracing::debug!(%id, files = files.len(), "Submission accepted");

        self.request_scroll();

        let attached = (!files.is_empty()).then_some(files.as_slice());
        self.parser.parse(&text, attached);

        SubmitOutcome::Accepted(id)
    }

    /// Append a bot message on the application's behalf
    pub fn post_bot_message(&self, text: impl Into<String>) -> MessageId {
        let id = self.store.append_message(Message::bot(text));
        self.request_scroll();
        id
    }

    fn request_scroll(&self) {
        if let Some(scroll) = &self.scroll {
            scroll.scroll_to_bottom();
        }
    }
}
