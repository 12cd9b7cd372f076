//! Transcript View
//!
//! A borderless, scrollable block of pre-wrapped lines. The scroll position is
//! the shared [`Viewport`] so the scroll coordinator can move it between
//! frames; every render records the new extent first.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{StatefulWidget, Widget};

use chatkit_core::Viewport;

use crate::theme::{FADE_FAR, FADE_NEAR};

/// Renders transcript lines from the viewport offset down
pub struct TranscriptView<'a> {
    lines: &'a [Line<'static>],
    fade_edges: bool,
}

impl<'a> TranscriptView<'a> {
    pub fn new(lines: &'a [Line<'static>]) -> Self {
        Self {
            lines,
            fade_edges: true,
        }
    }

    /// Dim the rows next to hidden content
    pub fn fade_edges(mut self, fade: bool) -> Self {
        self.fade_edges = fade;
        self
    }
}

impl StatefulWidget for TranscriptView<'_> {
    type State = Viewport;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let height = area.height as usize;
        state.set_extent(self.lines.len(), height);

        let has_content_above = state.offset > 0;
        let has_content_below = !state.is_at_bottom();

        for (i, line) in self.lines.iter().skip(state.offset).take(height).enumerate() {
            let row = Rect::new(area.x, area.y + i as u16, area.width, 1);

            let fade = if !self.fade_edges {
                None
            } else if has_content_above && i < 2 {
                Some(if i == 0 { FADE_FAR } else { FADE_NEAR })
            } else if has_content_below && i + 2 >= height {
                Some(if i + 1 == height { FADE_FAR } else { FADE_NEAR })
            } else {
                None
            };

            match fade {
                Some(shade) => {
                    let plain: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
                    Line {
                        alignment: line.alignment,
                        ..Line::styled(plain, Style::default().fg(shade))
                    }
                    .render(row, buf);
                }
                None => line.clone().render(row, buf),
            }
        }
    }
}
