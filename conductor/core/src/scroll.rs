//! Transcript Scroll Anchoring
//!
//! After a submission (or any store change) the transcript should land on its
//! newest message. The jump is deferred by [`SCROLL_SETTLE_DELAY`] so the
//! surface can lay out the new content first, otherwise the jump targets the
//! old bottom.
//!
//! Pending jumps are tracked in a [`JoinSet`] owned by the coordinator and
//! aborted when it is dropped, so no task outlives the view it scrolls. The
//! viewport itself is held weakly for the same reason.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinSet;

/// Delay between a scroll request and the jump
pub const SCROLL_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Anything that can re-anchor a transcript to its bottom
pub trait ScrollTrigger: Send + Sync {
    /// Request a jump to the newest message
    fn scroll_to_bottom(&self);
}

// ============================================================================
// Viewport
// ============================================================================

/// Scroll position of a transcript, in rows from the top
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    /// First visible row
    pub offset: usize,
    /// Largest valid offset for the current content
    pub max_offset: usize,
    /// Keep the bottom pinned as content grows
    pub follow: bool,
}

/// Viewport shared between the renderer and the scroll coordinator
pub type SharedViewport = Arc<Mutex<Viewport>>;

impl Viewport {
    /// Viewport that starts pinned to the bottom
    #[must_use]
    pub fn following() -> Self {
        Self {
            follow: true,
            ..Self::default()
        }
    }

    /// Record the laid-out content height and visible height
    pub fn set_extent(&mut self, content_rows: usize, visible_rows: usize) {
        self.max_offset = content_rows.saturating_sub(visible_rows);
        if self.follow {
            self.offset = self.max_offset;
        } else {
            self.offset = self.offset.min(self.max_offset);
        }
    }

    /// Scroll by `delta` rows (negative is up)
    pub fn scroll_by(&mut self, delta: isize) {
        let target = self.offset.saturating_add_signed(delta);
        self.offset = target.min(self.max_offset);
        self.follow = self.is_at_bottom();
    }

    /// Jump to the newest content and stay there
    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset;
        self.follow = true;
    }

    /// Whether the last row is visible
    #[must_use]
    pub fn is_at_bottom(&self) -> bool {
        self.offset >= self.max_offset
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Schedules deferred bottom-jumps for one viewport
#[derive(Debug)]
pub struct ScrollCoordinator {
    viewport: Weak<Mutex<Viewport>>,
    tasks: Mutex<JoinSet<()>>,
    delay: Duration,
    enabled: bool,
}

impl ScrollCoordinator {
    /// Coordinator for `viewport` using [`SCROLL_SETTLE_DELAY`]
    #[must_use]
    pub fn new(viewport: &SharedViewport) -> Self {
        Self {
            viewport: Arc::downgrade(viewport),
            tasks: Mutex::new(JoinSet::new()),
            delay: SCROLL_SETTLE_DELAY,
            enabled: true,
        }
    }

    /// Override the settle delay
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Turn automatic anchoring on or off
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether requests do anything
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of jumps scheduled but not yet applied
    #[must_use]
    pub fn pending(&self) -> usize {
        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    /// Schedule a jump after the settle delay
    pub fn request(&self) {
        if !self.enabled {
            return;
        }

        let viewport = self.viewport.clone();
        let Ok(handle) = Handle::try_current() else {
            // No runtime to defer on; apply now
            apply(&viewport);
            return;
        };

        let delay = self.delay;
        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn_on(
            async move {
                tokio::time::sleep(delay).await;
                apply(&viewport);
            },
            &handle,
        );
    }
}

fn apply(viewport: &Weak<Mutex<Viewport>>) {
    match viewport.upgrade() {
        Some(viewport) => viewport.lock().scroll_to_bottom(),
        None => tracing::trace!("Viewport gone before scroll applied"),
    }
}

impl ScrollTrigger for ScrollCoordinator {
    fn scroll_to_bottom(&self) {
        self.request();
    }
}

impl Drop for ScrollCoordinator {
    fn drop(&mut self) {
        self.tasks.get_mut().abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scrolled_up() -> SharedViewport {
        let mut viewport = Viewport::default();
        viewport.set_extent(100, 20);
        viewport.offset = 10;
        Arc::new(Mutex::new(viewport))
    }

    #[test]
    fn test_viewport_follow_keeps_bottom() {
        let mut viewport = Viewport::following();
        viewport.set_extent(30, 10);
        assert_eq!(viewport.offset, 20);
        viewport.set_extent(45, 10);
        assert_eq!(viewport.offset, 35);
    }

    #[test]
    fn test_viewport_scroll_up_releases_follow() {
        let mut viewport = Viewport::following();
        viewport.set_extent(30, 10);
        viewport.scroll_by(-5);
        assert_eq!(viewport.offset, 15);
        assert!(!viewport.follow);

        viewport.set_extent(40, 10);
        assert_eq!(viewport.offset, 15);

        viewport.scroll_by(100);
        assert!(viewport.is_at_bottom());
        assert!(viewport.follow);
    }

    #[test]
    fn test_viewport_clamps_when_content_shrinks() {
        let mut viewport = Viewport::default();
        viewport.set_extent(50, 10);
        viewport.offset = 40;
        viewport.set_extent(5, 10);
        assert_eq!(viewport.offset, 0);
        assert!(viewport.is_at_bottom());
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_waits_for_settle_delay() {
        let viewport = scrolled_up();
        let coordinator = ScrollCoordinator::new(&viewport);

        coordinator.scroll_to_bottom();
        tokio::task::yield_now().await;
        assert_eq!(viewport.lock().offset, 10);
        assert_eq!(coordinator.pending(), 1);

        tokio::time::sleep(SCROLL_SETTLE_DELAY + Duration::from_millis(1)).await;
        assert_eq!(viewport.lock().offset, 80);
        assert_eq!(coordinator.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_jump() {
        let viewport = scrolled_up();
        let coordinator = ScrollCoordinator::new(&viewport);
        coordinator.scroll_to_bottom();
        drop(coordinator);

        tokio::time::sleep(SCROLL_SETTLE_DELAY * 2).await;
        assert_eq!(viewport.lock().offset, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_coordinator_does_nothing() {
        let viewport = scrolled_up();
        let coordinator = ScrollCoordinator::new(&viewport).enabled(false);
        coordinator.scroll_to_bottom();
        assert_eq!(coordinator.pending(), 0);

        tokio::time::sleep(SCROLL_SETTLE_DELAY * 2).await;
        assert_eq!(viewport.lock().offset, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_viewport_dropped_before_jump() {
        let viewport = scrolled_up();
        let coordinator = ScrollCoordinator::new(&viewport);
        coordinator.scroll_to_bottom();
        drop(viewport);

        tokio::time::sleep(SCROLL_SETTLE_DELAY * 2).await;
        assert_eq!(coordinator.pending(), 0);
    }

    #[test]
    fn test_without_runtime_applies_immediately() {
        let viewport = scrolled_up();
        let coordinator = ScrollCoordinator::new(&viewport);
        coordinator.scroll_to_bottom();
        assert_eq!(viewport.lock().offset, 80);
    }
}
