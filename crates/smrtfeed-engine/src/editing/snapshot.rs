use std::ops::Range;

use crate::editing::mapping::live_spans;
use crate::editing::patch::{PatchId, PatchLog};

/// Origin of a run of rendered text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Text copied verbatim from the baseline
    Baseline,
    /// Replacement text of a committed patch
    Patched { id: PatchId },
}

/// A contiguous run of rendered text with its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Byte range in the rendered text
    pub live: Range<usize>,
    /// Byte range in the baseline this run stands for
    pub baseline: Range<usize>,
    pub text: String,
}

/// Immutable view of an annotated document for rendering
///
/// Snapshots let the presentation layer highlight committed changes without
/// reaching into the patch log:
///
/// ```rust
/// # use smrtfeed_engine::editing::{AnnotatedDocument, Patch, SegmentKind};
/// let mut doc = AnnotatedDocument::new("The quick fox jumps.");
/// doc.commit(Patch::new(4, 9, "slow")).unwrap();
///
/// for segment in &doc.snapshot().segments {
///     match segment.kind {
///         SegmentKind::Patched { .. } => println!("[{}]", segment.text),
///         SegmentKind::Baseline => println!("{}", segment.text),
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Log version for change detection
    pub version: u64,
    pub text: String,
    /// Ordered, gap-free partition of `text`; empty runs are omitted
    pub segments: Vec<Segment>,
}

impl Snapshot {
    /// Segments produced by committed patches
    pub fn patched(&self) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(|segment| matches!(segment.kind, SegmentKind::Patched { .. }))
    }
}

pub(crate) fn create_snapshot(log: &PatchLog, rendered: &str) -> Snapshot {
    let mut segments = Vec::new();
    let mut live_cursor = 0;
    let mut baseline_cursor = 0;

    for span in live_spans(log) {
        push_segment(
            &mut segments,
            SegmentKind::Baseline,
            live_cursor..span.live.start,
            baseline_cursor..span.baseline.start,
            rendered,
        );
        push_segment(
            &mut segments,
            SegmentKind::Patched { id: span.id },
            span.live.clone(),
            span.baseline.clone(),
            rendered,
        );
        live_cursor = span.live.end;
        baseline_cursor = span.baseline.end;
    }

    push_segment(
        &mut segments,
        SegmentKind::Baseline,
        live_cursor..rendered.len(),
        baseline_cursor..log.baseline().len(),
        rendered,
    );

    Snapshot {
        version: log.version(),
        text: rendered.to_string(),
        segments,
    }
}

fn push_segment(
    segments: &mut Vec<Segment>,
    kind: SegmentKind,
    live: Range<usize>,
    baseline: Range<usize>,
    rendered: &str,
) {
    if live.is_empty() {
        return;
    }
    let text = rendered.get(live.clone()).unwrap_or_default().to_string();
    segments.push(Segment {
        kind,
        live,
        baseline,
        text,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::AnnotatedDocument;
    use crate::editing::patch::Patch;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn describe(snapshot: &Snapshot) -> String {
        snapshot
            .segments
            .iter()
            .map(|segment| match segment.kind {
                SegmentKind::Baseline => segment.text.clone(),
                SegmentKind::Patched { .. } => format!("[{}]", segment.text),
            })
            .collect()
    }

    #[test]
    fn test_snapshot_empty_document() {
        let doc = AnnotatedDocument::new("");
        let snapshot = doc.snapshot();

        assert_eq!(snapshot.text, "");
        assert!(snapshot.segments.is_empty());
    }

    #[test]
    fn test_snapshot_unpatched_document_is_one_segment() {
        let doc = AnnotatedDocument::new("plain text");
        let snapshot = doc.snapshot();

        assert_eq!(snapshot.segments.len(), 1);
        assert_eq!(snapshot.segments[0].kind, SegmentKind::Baseline);
        assert_eq!(snapshot.segments[0].live, 0..10);
        assert_eq!(snapshot.segments[0].baseline, 0..10);
    }

    #[test]
    fn test_snapshot_marks_patched_runs() {
        let mut doc = AnnotatedDocument::new("The quick fox jumps over the lazy dog.");
        let slow = doc.commit(Patch::new(4, 9, "slow")).unwrap();
        doc.commit(Patch::new(34, 37, "cat")).unwrap();
        doc.commit(Patch::new(37, 38, "!")).unwrap();

        let snapshot = doc.snapshot();

        assert_snapshot!(describe(&snapshot), @"The [slow] fox jumps over the lazy [cat][!]");
        assert_eq!(snapshot.version, 3);
        let first = snapshot.patched().next().unwrap();
        assert_eq!(first.kind, SegmentKind::Patched { id: slow });
        assert_eq!(first.baseline, 4..9);
        assert_eq!(first.live, 4..8);
    }

    #[test]
    fn test_snapshot_segments_partition_text() {
        let mut doc = AnnotatedDocument::new("abcdefghij");
        doc.commit(Patch::new(0, 2, "")).unwrap();
        doc.commit(Patch::new(5, 5, "++")).unwrap();
        doc.commit(Patch::new(8, 10, "XYZ")).unwrap();

        let snapshot = doc.snapshot();
        let joined: String = snapshot.segments.iter().map(|s| s.text.as_str()).collect();

        assert_eq!(joined, snapshot.text);
        assert_snapshot!(describe(&snapshot), @"cde[++]fgh[XYZ]");
        assert!(snapshot.segments.windows(2).all(|w| w[0].live.end == w[1].live.start));
    }
}
