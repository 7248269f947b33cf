use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;

use crate::editing::mapping::{self, LiveSpan};
use crate::editing::patch::{Patch, PatchId, PatchLog};
use crate::editing::selection::{self, OverlayMetrics, RawSelection, SelectionEvent};
use crate::editing::snapshot::{self, Snapshot};
use crate::error::{MappingError, ValidationError};

/// Rendered text tagged with the log version it was produced from
#[derive(Debug, Clone)]
struct RenderedText {
    log_version: u64,
    text: Rc<str>,
}

/// Document being annotated in one editing session
///
/// AnnotatedDocument owns the session's patch log and is the only place the log
/// is replaced:
///
/// ## 1. Immutable baseline
/// - The baseline is fixed at load time and shared by every log value
/// - Persistence always stores the baseline, never the rendered text
///
/// ## 2. Patch log
/// - Grows only through [`AnnotatedDocument::commit`], which validates first
/// - A rejected commit leaves the document exactly as it was
///
/// ## 3. Derived rendered text
/// - Recomputed lazily and cached against the log version
/// - Selections, overlay anchors and snapshots are computed from it
///
/// ## Usage Pattern
///
/// ```rust
/// # use smrtfeed_engine::editing::{AnnotatedDocument, Patch};
/// let mut doc = AnnotatedDocument::new("The quick fox jumps.");
/// doc.commit(Patch::new(4, 9, "slow")).unwrap();
///
/// assert_eq!(&*doc.rendered(), "The slow fox jumps.");
/// assert_eq!(doc.baseline(), "The quick fox jumps.");
/// ```
#[derive(Debug)]
pub struct AnnotatedDocument {
    log: PatchLog,
    cache: RefCell<Option<RenderedText>>,
}

impl AnnotatedDocument {
    /// Start a session over a baseline with no committed patches
    pub fn new(baseline: impl Into<Arc<str>>) -> Self {
        Self::from_log(PatchLog::new(baseline))
    }

    /// Resume a session from a previously persisted log
    pub fn from_log(log: PatchLog) -> Self {
        Self {
            log,
            cache: RefCell::new(None),
        }
    }

    pub fn baseline(&self) -> &str {
        self.log.baseline()
    }

    pub fn log(&self) -> &PatchLog {
        &self.log
    }

    pub fn version(&self) -> u64 {
        self.log.version()
    }

    /// Current rendered text, recomputed only when the log has changed
    pub fn rendered(&self) -> Rc<str> {
        let mut cache = self.cache.borrow_mut();
        if let Some(cached) = cache.as_ref()
            && cached.log_version == self.log.version()
        {
            return Rc::clone(&cached.text);
        }

        let text: Rc<str> = Rc::from(self.log.render());
        *cache = Some(RenderedText {
            log_version: self.log.version(),
            text: Rc::clone(&text),
        });
        text
    }

    /// Validate and commit a patch; on error nothing changes
    pub fn commit(&mut self, patch: Patch) -> Result<PatchId, ValidationError> {
        let id = patch.id;
        self.log = self.log.add_patch(patch)?;
        Ok(id)
    }

    /// Would `range` be accepted as a new patch right now?
    pub fn check_range(&self, range: Range<usize>) -> Result<(), ValidationError> {
        self.log.validate(&Patch::new(range.start, range.end, String::new()))
    }

    pub fn track_selection(&self, raw: &RawSelection, metrics: &OverlayMetrics) -> SelectionEvent {
        selection::track_selection(raw, &self.rendered(), &self.log, metrics)
    }

    pub fn live_to_baseline(&self, live: Range<usize>) -> Result<Range<usize>, MappingError> {
        mapping::live_range_to_baseline(live, &self.log)
    }

    pub fn baseline_to_live(&self, baseline: Range<usize>) -> Range<usize> {
        mapping::baseline_range_to_live(baseline, &self.log)
    }

    pub fn live_spans(&self) -> Vec<LiveSpan> {
        mapping::live_spans(&self.log).collect()
    }

    /// Immutable view of the rendered text and where the committed changes are
    pub fn snapshot(&self) -> Snapshot {
        snapshot::create_snapshot(&self.log, &self.rendered())
    }
}

impl Clone for AnnotatedDocument {
    fn clone(&self) -> Self {
        Self::from_log(self.log.clone())
    }
}
