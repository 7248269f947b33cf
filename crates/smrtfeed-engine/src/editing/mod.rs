/*!
 * # Editing Core Module
 *
 * This module implements the patch-based annotation model: a document is an
 * immutable baseline plus an ordered log of committed replacements.
 *
 * ## Architecture Overview
 *
 * ### 1. Immutable Baseline
 * - The text loaded at session start never changes
 * - Persistence always writes the baseline, so the original is recoverable
 *
 * ### 2. Patch Log
 * - Committed replacements are **Patches** over baseline byte ranges
 * - Intervals never overlap; the log stays sorted by start offset
 * - Every insert yields a new log value, so a rejected insert is a no-op
 *
 * ### 3. Two Coordinate Spaces
 * - **Baseline** offsets address the original text (what patches store)
 * - **Live** offsets address the rendered text (what the user selects)
 * - A patch's rendered span is atomic: selections cover all of it or none of it
 *
 * ### 4. Pure Selection Tracking
 * - Raw selection events are offsets plus rectangles reported by the UI
 * - Tracking is a pure function producing a live range and overlay placement
 *
 * ## Module Structure
 *
 * - **`patch`**: `Patch`, `PatchLog`, rendering and validated insertion
 * - **`mapping`**: live ↔ baseline offset translation
 * - **`selection`**: raw selection → `SelectionEvent`, overlay placement
 * - **`document`**: `AnnotatedDocument` tying log, render cache and mapping together
 * - **`snapshot`**: read-only segment view for highlighting committed changes
 *
 * ## Usage Pattern
 *
 * ```rust
 * use smrtfeed_engine::editing::*;
 *
 * // 1. Load a baseline
 * let mut doc = AnnotatedDocument::new("The quick fox jumps.");
 *
 * // 2. Map a live selection back to the baseline
 * let baseline = doc.live_to_baseline(4..9).unwrap();
 *
 * // 3. Commit a replacement over that range
 * doc.commit(Patch::new(baseline.start, baseline.end, "slow")).unwrap();
 *
 * // 4. Render
 * assert_eq!(&*doc.rendered(), "The slow fox jumps.");
 * ```
 */

pub mod document;
pub mod mapping;
pub mod patch;
pub mod selection;
pub mod snapshot;

pub use document::AnnotatedDocument;
pub use mapping::{
    LiveSpan, baseline_range_to_live, baseline_to_live, live_range_to_baseline, live_spans,
    live_to_baseline, snap_to_patch_spans,
};
pub use patch::{Patch, PatchId, PatchLog, render};
pub use selection::{
    LiveSelection, OverlayMetrics, OverlayPlacement, OverlaySide, RawSelection, Rect,
    SelectionEvent, place_overlay, track_selection,
};
pub use snapshot::{Segment, SegmentKind, Snapshot};
