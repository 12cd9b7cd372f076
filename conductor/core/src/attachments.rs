//! Attachment Lifecycle
//!
//! Owns the transient file references a user attaches to a message and the
//! revocable preview URLs used to display them.
//!
//! # Preview URL discipline
//!
//! A [`PreviewUrl`] is a guard: creating one registers the URL with a
//! [`PreviewBackend`], dropping it revokes the URL. Since the guard is not
//! `Clone`, a URL can be released at most once and cannot be read after
//! release. [`PreviewCache`] keeps exactly one guard per live file reference
//! (pending input plus submitted messages) and reconciles that set once per
//! frame, before rendering, so a URL is only revoked after the render that
//! last used it has completed.
//!
//! ```text
//!   pick files ──▶ add_files ──▶ PendingInput.files ──┐
//!                                                     ├─▶ PreviewCache::sync ──▶ url_for()
//!   submit ──▶ Message.attachments (same FileIds) ────┘        │
//!                                                              └─▶ drop stale guards (revoke)
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Hard cap on concurrently attached files
pub const MAX_ATTACHMENTS: usize = 5;

/// File extensions accepted by the file input (lowercase, no dot)
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

// ============================================================================
// File References
// ============================================================================

/// Identity of one picked file
///
/// Two picks of the same path are two distinct references, each with its own
/// preview URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u64);

impl FileId {
    /// Allocate a new unique file ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw numeric value
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file-{}", self.0)
    }
}

/// A file picked by the user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(skip)]
    id: FileId,
    /// Display name (file name component of the path)
    pub name: String,
    /// Location on disk
    pub path: PathBuf,
}

impl FileRef {
    /// Reference a file on disk
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self {
            id: FileId::new(),
            name,
            path,
        }
    }

    /// Identity of this reference
    #[must_use]
    pub fn id(&self) -> FileId {
        self.id
    }

    /// Lowercased extension, if any
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    /// Whether the file input accepts this file type
    #[must_use]
    pub fn is_accepted_type(&self) -> bool {
        self.extension()
            .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
    }
}

// ============================================================================
// Selection Operations
// ============================================================================

/// Errors raised by attachment operations
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AttachmentError {
    /// The merged selection would exceed the cap
    #[error("You can upload up to {limit} files.")]
    TooManyFiles {
        /// The configured cap
        limit: usize,
        /// Count the selection would have reached
        attempted: usize,
    },

    /// A picked file is not an accepted image type
    #[error("{name} can't be attached. Only .png, .jpg and .jpeg files are supported.")]
    UnsupportedFileType {
        /// Name of the offending file
        name: String,
    },

    /// Removal index does not address a pending file
    #[error("no attachment at index {index} (selection has {len})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Current selection length
        len: usize,
    },

    /// File input is disabled by the embedding application
    #[error("file input is disabled")]
    FileInputDisabled,
}

impl AttachmentError {
    /// Whether this rejection is reported to the user as a bot message
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::TooManyFiles { .. } | Self::UnsupportedFileType { .. }
        )
    }
}

/// Merge newly picked files after the existing selection
///
/// # Errors
///
/// Returns [`AttachmentError::UnsupportedFileType`] if any picked file is not
/// an accepted image, or [`AttachmentError::TooManyFiles`] if the merged count
/// would exceed [`MAX_ATTACHMENTS`]. The existing selection is never modified.
pub fn add_files(existing: &[FileRef], new_files: &[FileRef]) -> Result<Vec<FileRef>, AttachmentError> {
    if let Some(rejected) = new_files.iter().find(|f| !f.is_accepted_type()) {
        return Err(AttachmentError::UnsupportedFileType {
            name: rejected.name.clone(),
        });
    }

    let attempted = existing.len() + new_files.len();
    if attempted > MAX_ATTACHMENTS {
        return Err(AttachmentError::TooManyFiles {
            limit: MAX_ATTACHMENTS,
            attempted,
        });
    }

    Ok(existing.iter().chain(new_files).cloned().collect())
}

/// Remove the file at `index`, preserving the order of the rest
///
/// # Errors
///
/// Returns [`AttachmentError::IndexOutOfRange`] when `index` is past the end.
pub fn remove_file(files: &[FileRef], index: usize) -> Result<Vec<FileRef>, AttachmentError> {
    if index >= files.len() {
        return Err(AttachmentError::IndexOutOfRange {
            index,
            len: files.len(),
        });
    }

    let mut remaining = files.to_vec();
    remaining.remove(index);
    Ok(remaining)
}

// ============================================================================
// Preview URLs
// ============================================================================

/// Allocates and revokes preview URLs
pub trait PreviewBackend: Send + Sync {
    /// Register a URL that displays `file`
    fn create_url(&self, file: &FileRef) -> String;

    /// Revoke a URL previously returned by `create_url`
    fn revoke_url(&self, url: &str);
}

/// A live preview URL, revoked when dropped
pub struct PreviewUrl {
    url: String,
    file: FileId,
    backend: Arc<dyn PreviewBackend>,
}

impl PreviewUrl {
    /// The URL string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The file this URL previews
    #[must_use]
    pub fn file_id(&self) -> FileId {
        self.file
    }
}

impl fmt::Debug for PreviewUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewUrl")
            .field("url", &self.url)
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

impl Drop for PreviewUrl {
    fn drop(&mut self) {
        self.backend.revoke_url(&self.url);
        tracing::trace!(url = %self.url, file = %self.file, "Revoked preview URL");
    }
}

/// Creates and releases preview URLs against one backend
#[derive(Clone)]
pub struct AttachmentManager {
    backend: Arc<dyn PreviewBackend>,
}

impl AttachmentManager {
    /// Create a manager for the given backend
    pub fn new(backend: Arc<dyn PreviewBackend>) -> Self {
        Self { backend }
    }

    /// One preview URL per file, in order
    #[must_use]
    pub fn materialize_previews(&self, files: &[FileRef]) -> Vec<PreviewUrl> {
        files.iter().map(|file| self.materialize(file)).collect()
    }

    /// Release URLs obtained from [`Self::materialize_previews`]
    pub fn release_previews(&self, urls: Vec<PreviewUrl>) {
        let count = urls.len();
        drop(urls);
        if count > 0 {
            tracing::debug!(count, "Released preview URLs");
        }
    }

    /// A cache that keeps one preview per live file
    #[must_use]
    pub fn preview_cache(&self) -> PreviewCache {
        PreviewCache::new(self.clone())
    }

    fn materialize(&self, file: &FileRef) -> PreviewUrl {
        let url = self.backend.create_url(file);
        tracing::trace!(%url, file = %file.id(), name = %file.name, "Created preview URL");
        PreviewUrl {
            url,
            file: file.id(),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl fmt::Debug for AttachmentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentManager").finish_non_exhaustive()
    }
}

/// Outcome of one [`PreviewCache::sync`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PreviewSync {
    /// URLs created for newly live files
    pub created: usize,
    /// URLs released for files no longer referenced
    pub released: usize,
}

/// One preview URL per live file reference
#[derive(Debug)]
pub struct PreviewCache {
    manager: AttachmentManager,
    /// Live file sequence at the last sync
    key: Vec<FileId>,
    entries: HashMap<FileId, PreviewUrl>,
}

impl PreviewCache {
    /// Create an empty cache
    pub fn new(manager: AttachmentManager) -> Self {
        Self {
            manager,
            key: Vec::new(),
            entries: HashMap::new(),
        }
    }

    /// Reconcile against the files still referenced anywhere
    ///
    /// URLs of files that remain live are kept as-is, new files get a URL,
    /// and every URL whose file is gone is released. Does nothing when the
    /// live file sequence is unchanged since the previous sync.
    pub fn sync<'a, I>(&mut self, live: I) -> PreviewSync
    where
        I: IntoIterator<Item = &'a FileRef>,
    {
        let live: Vec<&FileRef> = live.into_iter().collect();
        let key: Vec<FileId> = live.iter().map(|f| f.id()).collect();
        if key == self.key {
            return PreviewSync::default();
        }

        let mut next = HashMap::with_capacity(live.len());
        let mut created = 0;
        for file in live {
            if next.contains_key(&file.id()) {
                continue;
            }
            let url = if let Some(url) = self.entries.remove(&file.id()) {
                url
            } else {
                created += 1;
                self.manager.materialize(file)
            };
            next.insert(file.id(), url);
        }

        let stale: Vec<PreviewUrl> = std::mem::replace(&mut self.entries, next)
            .into_values()
            .collect();
        let released = stale.len();
        self.manager.release_previews(stale);
        self.key = key;

        PreviewSync { created, released }
    }

    /// URL previewing `file`, if it was live at the last sync
    #[must_use]
    pub fn url_for(&self, file: &FileRef) -> Option<&str> {
        self.entries.get(&file.id()).map(PreviewUrl::as_str)
    }

    /// Number of live URLs
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no URLs are live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every URL
    pub fn clear(&mut self) {
        self.key.clear();
        let all: Vec<PreviewUrl> = self.entries.drain().map(|(_, url)| url).collect();
        self.manager.release_previews(all);
    }
}

// ============================================================================
// Object URL Registry
// ============================================================================

/// In-process `blob:` URL registry
///
/// Mirrors the browser's object URL table: each created URL maps to the file
/// path it previews until revoked.
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    entries: DashMap<String, PathBuf>,
}

impl ObjectUrlRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Path behind a live URL
    #[must_use]
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        self.entries.get(url).map(|entry| entry.value().clone())
    }

    /// Number of URLs not yet revoked
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries.len()
    }
}

impl PreviewBackend for ObjectUrlRegistry {
    fn create_url(&self, file: &FileRef) -> String {
        let url = format!("blob:chatkit/{}", Uuid::new_v4());
        self.entries.insert(url.clone(), file.path.clone());
        url
    }

    fn revoke_url(&self, url: &str) {
        if self.entries.remove(url).is_none() {
            tracing::warn!(%url, "Revoked a preview URL that was not live");
        }
    }
}
