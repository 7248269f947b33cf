//! Translation between live (rendered) offsets and baseline offsets.
//!
//! A committed patch's rendered span is atomic: a live offset strictly inside a
//! replacement has no baseline counterpart, and a live range that touches a
//! replacement must cover all of it. Offsets outside every replacement map with a
//! constant shift accumulated from the patches before them.

use std::ops::Range;

use crate::editing::patch::{PatchId, PatchLog};
use crate::error::MappingError;

/// Where one patch sits in both coordinate spaces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSpan {
    pub id: PatchId,
    pub baseline: Range<usize>,
    pub live: Range<usize>,
}

impl LiveSpan {
    /// `offset` lies strictly between the span's live edges
    fn strictly_contains(&self, offset: usize) -> bool {
        self.live.start < offset && offset < self.live.end
    }
}

/// Live-space position of every patch, ascending.
///
/// Each patch shifts everything after it by `len(replacement) - len(original span)`.
pub fn live_spans(log: &PatchLog) -> impl Iterator<Item = LiveSpan> + '_ {
    let mut shift: isize = 0;
    log.patches().iter().map(move |patch| {
        let live_start = (patch.start as isize + shift) as usize;
        let live_end = live_start + patch.replacement.len();
        shift += patch.delta();
        LiveSpan {
            id: patch.id,
            baseline: patch.range(),
            live: live_start..live_end,
        }
    })
}

/// Map a live offset to the baseline.
///
/// Offsets on a replacement's edges map to the edges of the replaced baseline span.
pub fn live_to_baseline(live_offset: usize, log: &PatchLog) -> Result<usize, MappingError> {
    map_live_offset(live_offset, log, false)
}

/// `leading` marks the first edge of a range: at a deletion (an empty rendered
/// span) it maps past the deleted text instead of before it.
fn map_live_offset(live_offset: usize, log: &PatchLog, leading: bool) -> Result<usize, MappingError> {
    let len = log.rendered_len();
    if live_offset > len {
        return Err(MappingError::OutOfBounds {
            offset: live_offset,
            len,
        });
    }

    let mut shift: isize = 0;
    for span in live_spans(log) {
        if live_offset < span.live.start {
            break;
        }
        if live_offset == span.live.start && !(leading && span.live.is_empty()) {
            return Ok(span.baseline.start);
        }
        if span.strictly_contains(live_offset) {
            return Err(MappingError::InsidePatch {
                offset: live_offset,
                patch: span.id,
                live: span.live,
            });
        }
        // At or beyond the replacement's end
        shift = span.live.end as isize - span.baseline.end as isize;
    }

    Ok((live_offset as isize - shift) as usize)
}

/// Map a baseline offset into live space.
///
/// An offset inside a replaced baseline span has no live counterpart of its own;
/// it anchors to the start of that patch's replacement. A zero-length insertion
/// patch anchors its offset before the inserted text.
pub fn baseline_to_live(baseline_offset: usize, log: &PatchLog) -> usize {
    let mut shift: isize = 0;
    for patch in log.patches() {
        if baseline_offset < patch.start {
            break;
        }
        if baseline_offset == patch.start || baseline_offset < patch.end {
            return (patch.start as isize + shift) as usize;
        }
        shift += patch.delta();
    }
    (baseline_offset as isize + shift) as usize
}

/// Map a live selection to the baseline range it covers.
///
/// Both edges must lie outside every replacement's interior; a selection that
/// exactly covers a replacement maps back to that patch's baseline interval.
pub fn live_range_to_baseline(
    live: Range<usize>,
    log: &PatchLog,
) -> Result<Range<usize>, MappingError> {
    let start = map_live_offset(live.start, log, true)?;
    let end = map_live_offset(live.end, log, false)?;
    Ok(start..end.max(start))
}

/// Re-project a stored baseline range into the current live text
pub fn baseline_range_to_live(baseline: Range<usize>, log: &PatchLog) -> Range<usize> {
    let start = baseline_to_live(baseline.start, log);
    let end = baseline_to_live(baseline.end, log);
    start..end.max(start)
}

/// Widen a live range so neither edge falls inside a replacement.
///
/// This is how a raw selection is brought in line with the atomic-span policy:
/// touching any part of a replacement selects the whole replacement.
pub fn snap_to_patch_spans(live: Range<usize>, log: &PatchLog) -> Range<usize> {
    let mut start = live.start;
    let mut end = live.end;
    for span in live_spans(log) {
        if span.live.start >= end {
            break;
        }
        if span.strictly_contains(start) {
            start = span.live.start;
        }
        if span.strictly_contains(end) {
            end = span.live.end;
        }
    }
    start..end
}

/// Patches whose rendered span intersects `live`
pub fn patches_touching(live: Range<usize>, log: &PatchLog) -> Vec<LiveSpan> {
    live_spans(log)
        .filter(|span| span.live.start < live.end && live.start < span.live.end)
        .collect()
}
