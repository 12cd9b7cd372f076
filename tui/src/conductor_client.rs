//! Conductor Client
//!
//! Thin wrapper around the chatkit core for TUI integration.
//! It wires the conversation store, the conductor, the scroll coordinator and
//! the preview cache together so the app only deals with one handle.
//!
//! # Architecture
//!
//! The TUI is a "thin client" - it doesn't contain any business logic.
//! The TUI's job is:
//! 1. Convert terminal events to conductor calls
//! 2. Notice store changes and re-anchor the transcript
//! 3. Reconcile preview URLs once per frame
//! 4. Render the conversation state

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;

use chatkit_core::{
    AddFilesOutcome, AttachmentError, AttachmentManager, ChatConfig, ChatStore, Conductor,
    ConversationState, FileRef, FnParser, MessageParser, ObjectUrlRegistry, PendingInput, PreviewBackend,
    PreviewCache, PreviewSync, ScrollCoordinator, ScrollTrigger, SharedViewport, SubmitOutcome,
    Viewport,
};

/// Client for driving the embedded conductor
pub struct ConductorClient {
    /// The embedded conductor
    conductor: Conductor,
    /// Transcript scroll position, shared with the coordinator
    viewport: SharedViewport,
    /// Deferred bottom-jumps
    scroll: Arc<ScrollCoordinator>,
    /// Preview URLs for every live attachment
    previews: PreviewCache,
    /// Store change notifications
    changes: watch::Receiver<u64>,
    /// Last store version acted on
    last_seen: u64,
}

impl ConductorClient {
    /// Create a client for `config`, forwarding submissions to `parser`
    pub fn new(config: &ChatConfig, store: ChatStore, parser: Arc<dyn MessageParser>) -> Self {
        let viewport: SharedViewport = Arc::new(parking_lot::Mutex::new(Viewport::following()));
        let scroll = Arc::new(ScrollCoordinator::new(&viewport).enabled(!config.disable_scroll_to_bottom));
        let changes = store.subscribe();
        let last_seen = *changes.borrow();

        let backend: Arc<dyn PreviewBackend> = Arc::new(ObjectUrlRegistry::new());
        let previews = AttachmentManager::new(backend).preview_cache();

        let trigger: Arc<dyn ScrollTrigger> = scroll.clone();
        let conductor = Conductor::new(store, parser).with_scroll(trigger);

        tracing::debug!(scroll = scroll.is_enabled(), "Conductor client ready");

        Self {
            conductor,
            viewport,
            scroll,
            previews,
            changes,
            last_seen,
        }
    }

    /// Only accept text the validator approves
    #[must_use]
    pub fn with_validator(mut self, validator: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        // `ConductorClient` implements `Drop`, so the field is swapped out
        // with a short-lived placeholder rather than moved.
        let placeholder = Conductor::new(
            self.conductor.store().clone(),
            Arc::new(FnParser(|_: &str, _: Option<&[FileRef]>| {})),
        );
        let conductor = std::mem::replace(&mut self.conductor, placeholder);
        self.conductor = conductor.with_validator(validator);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The conversation store
    pub fn store(&self) -> &ChatStore {
        self.conductor.store()
    }

    /// Conversation snapshot
    pub fn snapshot(&self) -> ConversationState {
        self.conductor.store().snapshot()
    }

    /// Pending input
    pub fn pending(&self) -> PendingInput {
        self.conductor.pending()
    }

    /// Shared viewport
    pub fn viewport(&self) -> &SharedViewport {
        &self.viewport
    }

    /// Scroll trigger for widgets, `None` when anchoring is off
    pub fn scroll_trigger(&self) -> Option<&dyn ScrollTrigger> {
        self.scroll
            .is_enabled()
            .then_some(self.scroll.as_ref() as &dyn ScrollTrigger)
    }

    /// Preview URLs synced by the last [`Self::sync_previews`]
    pub fn previews(&self) -> &PreviewCache {
        &self.previews
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Type a character
    pub fn type_char(&self, c: char) -> bool {
        self.conductor.push_char(c)
    }

    /// Delete the last character
    pub fn backspace(&self) -> bool {
        self.conductor.pop_char()
    }

    /// Submit the pending input
    pub fn submit(&self) -> SubmitOutcome {
        self.conductor.submit()
    }

    /// Attach whitespace-separated file paths
    pub fn attach_paths(&self, paths: &str) -> AddFilesOutcome {
        let files: Vec<FileRef> = paths
            .split_whitespace()
            .map(|p| FileRef::new(expand_home(p)))
            .collect();
        self.conductor.add_files(files)
    }

    /// Remove the pending file at `index`
    pub fn remove_pending(&self, index: usize) -> Result<FileRef, AttachmentError> {
        self.conductor.remove_file(index)
    }

    /// Scroll the transcript by `delta` rows (negative is up)
    pub fn scroll_by(&self, delta: isize) {
        self.viewport.lock().scroll_by(delta);
    }

    /// Jump to the newest message now
    pub fn scroll_to_bottom(&self) {
        self.viewport.lock().scroll_to_bottom();
    }

    // ========================================================================
    // Frame Hooks
    // ========================================================================

    /// Wait for the next store change
    pub async fn changed(&mut self) {
        if self.changes.changed().await.is_err() {
            // Sender lives in the store we hold; never resolves
            std::future::pending::<()>().await;
        }
    }

    /// Act on a store change since the last call
    ///
    /// Schedules a scroll anchor when the version moved. Returns whether it did.
    pub fn poll_changes(&mut self) -> bool {
        let version = *self.changes.borrow_and_update();
        if version == self.last_seen {
            return false;
        }
        self.last_seen = version;
        self.scroll.request();
        true
    }

    /// Reconcile preview URLs with every attachment still referenced
    pub fn sync_previews(&mut self) -> PreviewSync {
        let (messages, pending) = self.conductor.store().read(|s| {
            let attached: Vec<FileRef> = s
                .conversation
                .messages
                .iter()
                .flat_map(|m| m.attachments.iter().cloned())
                .collect();
            (attached, s.pending.files.clone())
        });
        let sync = self.previews.sync(messages.iter().chain(pending.iter()));
        if sync != PreviewSync::default() {
            tracing::debug!(created = sync.created, released = sync.released, "Synced previews");
        }
        sync
    }

    /// Release every preview URL
    pub fn shutdown(&mut self) {
        self.previews.clear();
    }
}

impl Drop for ConductorClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn expand_home(path: &str) -> std::path::PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => Path::new(&home).join(rest),
        _ => Path::new(path).to_path_buf(),
    }
}
