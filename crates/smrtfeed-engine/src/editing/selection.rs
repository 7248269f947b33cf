//! Selection tracking: raw selection events in, live ranges and overlay placement out.
//!
//! The tracker never touches a rendering surface. The presentation layer reports
//! offsets and rectangles; everything here is a pure function of those values, the
//! rendered text and the patch log.

use std::ops::Range;

use smrtfeed_config::OverlayConfig;

use crate::editing::mapping::snap_to_patch_spans;
use crate::editing::patch::PatchLog;

/// Axis-aligned rectangle in container coordinates (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// Overlay dimensions used for placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayMetrics {
    pub width: f32,
    pub height: f32,
    pub gap: f32,
}

impl Default for OverlayMetrics {
    fn default() -> Self {
        Self::from(&OverlayConfig::default())
    }
}

impl From<&OverlayConfig> for OverlayMetrics {
    fn from(config: &OverlayConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            gap: config.gap,
        }
    }
}

/// A selection as reported by the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct RawSelection {
    /// Offset where the selection gesture began (live coordinates)
    pub anchor: usize,
    /// Offset where it currently ends; may precede `anchor`
    pub focus: usize,
    /// Bounding box of the selected text
    pub bounds: Rect,
    /// Visible part of the scrolling container
    pub viewport: Rect,
}

/// Offsets into the rendered text; never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSelection {
    pub start: usize,
    pub end: usize,
}

impl LiveSelection {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlaySide {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPlacement {
    pub side: OverlaySide,
    pub left: f32,
    pub top: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    SelectionChanged {
        selection: LiveSelection,
        text: String,
        placement: OverlayPlacement,
    },
    SelectionCleared,
}

/// Turn a raw selection into a [`SelectionEvent`].
///
/// The reported range is ordered, clamped to the rendered text, widened to
/// character boundaries and then to whole patch replacements. Selections that are
/// empty or only whitespace clear the selection.
pub fn track_selection(
    raw: &RawSelection,
    rendered: &str,
    log: &PatchLog,
    metrics: &OverlayMetrics,
) -> SelectionEvent {
    let start = raw.anchor.min(raw.focus).min(rendered.len());
    let end = raw.anchor.max(raw.focus).min(rendered.len());
    if start == end {
        return SelectionEvent::SelectionCleared;
    }

    let widened = floor_char_boundary(rendered, start)..ceil_char_boundary(rendered, end);
    let snapped = snap_to_patch_spans(widened, log);
    let text = &rendered[snapped.clone()];
    if text.trim().is_empty() {
        return SelectionEvent::SelectionCleared;
    }

    SelectionEvent::SelectionChanged {
        selection: LiveSelection {
            start: snapped.start,
            end: snapped.end,
        },
        text: text.to_string(),
        placement: place_overlay(&raw.bounds, &raw.viewport, metrics),
    }
}

/// Position the suggestion overlay next to `anchor`.
///
/// Above the anchor when the overlay fits below the viewport's top edge, otherwise
/// below it. Horizontally the overlay follows the anchor's left edge but stays
/// inside the viewport.
pub fn place_overlay(anchor: &Rect, viewport: &Rect, metrics: &OverlayMetrics) -> OverlayPlacement {
    let above = anchor.top - metrics.height - metrics.gap;
    let (side, top) = if above >= viewport.top {
        (OverlaySide::Above, above)
    } else {
        (OverlaySide::Below, anchor.bottom() + metrics.gap)
    };

    let max_left = (viewport.right() - metrics.width).max(viewport.left);
    let left = anchor.left.clamp(viewport.left, max_left);

    OverlayPlacement { side, left, top }
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

fn ceil_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset < text.len() && !text.is_char_boundary(offset) {
        offset += 1;
    }
    offset
}
