use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use uuid::Uuid;
use xi_rope::Rope;

use crate::error::ValidationError;

/// Stable identifier of a committed patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchId(pub Uuid);

impl PatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A committed replacement of the baseline span `start..end`
///
/// Offsets are UTF-8 byte offsets into the **baseline** text, never into the
/// rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub id: PatchId,
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl Patch {
    pub fn new(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            id: PatchId::new(),
            start,
            end,
            replacement: replacement.into(),
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Net change in text length once this patch is applied
    pub fn delta(&self) -> isize {
        self.replacement.len() as isize - (self.end - self.start) as isize
    }

    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }

    /// Whether two patches would compete for the same baseline text.
    ///
    /// Intersecting intervals conflict. Two insertions at the same offset conflict
    /// too, since their relative order is undefined. An insertion may share its
    /// offset with the start of a replacement; it renders before it.
    pub fn conflicts_with(&self, other: &Patch) -> bool {
        let intersects = self.start < other.end && other.start < self.end;
        let stacked_insertions =
            self.is_insertion() && other.is_insertion() && self.start == other.start;
        intersects || stacked_insertions
    }

    /// Sort key: ascending start, insertions ahead of replacements at the same offset
    fn order_key(&self) -> (usize, usize) {
        (self.start, self.end)
    }
}

/// Immutable baseline text plus an ordered, non-overlapping list of patches.
///
/// A `PatchLog` is a value: [`PatchLog::add_patch`] returns a new log and leaves
/// the receiver untouched, so a failed insert can never leave partial state behind.
/// Patches are kept sorted ascending by `start` (then `end`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchLog {
    baseline: Arc<str>,
    patches: Arc<[Patch]>,
    version: u64,
}

impl PatchLog {
    /// Empty log over a baseline
    pub fn new(baseline: impl Into<Arc<str>>) -> Self {
        Self {
            baseline: baseline.into(),
            patches: Arc::from(Vec::new()),
            version: 0,
        }
    }

    /// Build a log by validating each patch in turn.
    ///
    /// Patches that fail validation are returned alongside the log instead of
    /// aborting the whole build.
    pub fn from_patches(
        baseline: impl Into<Arc<str>>,
        patches: impl IntoIterator<Item = Patch>,
    ) -> (Self, Vec<(Patch, ValidationError)>) {
        let mut log = Self::new(baseline);
        let mut rejected = Vec::new();
        for patch in patches {
            match log.add_patch(patch.clone()) {
                Ok(next) => log = next,
                Err(err) => rejected.push((patch, err)),
            }
        }
        (log, rejected)
    }

    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Incremented on every successful insert (enables render-cache keys)
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, id: PatchId) -> Option<&Patch> {
        self.patches.iter().find(|patch| patch.id == id)
    }

    /// Length of the text produced by [`PatchLog::render`]
    pub fn rendered_len(&self) -> usize {
        let delta: isize = self.patches.iter().map(Patch::delta).sum();
        (self.baseline.len() as isize + delta) as usize
    }

    /// Check a candidate against the baseline and every committed patch
    pub fn validate(&self, candidate: &Patch) -> Result<(), ValidationError> {
        if candidate.start > candidate.end {
            return Err(ValidationError::InvertedRange {
                start: candidate.start,
                end: candidate.end,
            });
        }
        if candidate.end > self.baseline.len() {
            return Err(ValidationError::OutOfBounds {
                range: candidate.range(),
                len: self.baseline.len(),
            });
        }
        for offset in [candidate.start, candidate.end] {
            if !self.baseline.is_char_boundary(offset) {
                return Err(ValidationError::NotCharBoundary { offset });
            }
        }
        if let Some(existing) = self.patches.iter().find(|p| p.conflicts_with(candidate)) {
            return Err(ValidationError::Overlap {
                candidate: candidate.range(),
                existing: existing.id,
                existing_range: existing.range(),
            });
        }
        Ok(())
    }

    /// Return a new log with `candidate` inserted in sorted position.
    ///
    /// On any validation failure the receiver is the only log that exists, unchanged.
    pub fn add_patch(&self, candidate: Patch) -> Result<PatchLog, ValidationError> {
        self.validate(&candidate)?;

        let position = self
            .patches
            .partition_point(|p| p.order_key() < candidate.order_key());
        let mut patches = Vec::with_capacity(self.patches.len() + 1);
        patches.extend_from_slice(&self.patches[..position]);
        patches.push(candidate);
        patches.extend_from_slice(&self.patches[position..]);

        Ok(PatchLog {
            baseline: Arc::clone(&self.baseline),
            patches: Arc::from(patches),
            version: self.version + 1,
        })
    }

    /// Baseline with every patch applied
    pub fn render(&self) -> String {
        render(&self.baseline, &self.patches)
    }
}

/// Apply `patches` to `baseline`.
///
/// Patches are spliced in descending order of `start`, so a splice only ever moves
/// text *after* offsets that are still waiting to be applied. The order of the
/// input slice therefore does not matter.
///
/// The caller is expected to pass disjoint, in-bounds patches (a [`PatchLog`]
/// guarantees this). Anything else is skipped with a warning rather than spliced.
pub fn render(baseline: &str, patches: &[Patch]) -> String {
    if patches.is_empty() {
        return baseline.to_string();
    }

    let mut ordered: Vec<&Patch> = patches.iter().collect();
    ordered.sort_by(|a, b| b.order_key().cmp(&a.order_key()));

    let mut buffer = Rope::from(baseline);
    // Most recently applied splice; every later one must end at or before its start
    let mut previous: Option<&Patch> = None;

    for patch in ordered {
        let limit = previous.map_or(baseline.len(), |prev| prev.start);
        let stacked = previous.is_some_and(|prev| prev.conflicts_with(patch));
        let splicable = patch.start <= patch.end
            && patch.end <= limit
            && !stacked
            && baseline.is_char_boundary(patch.start)
            && baseline.is_char_boundary(patch.end);
        if !splicable {
            log::warn!(
                "skipping patch {} at {:?}: not disjoint or out of bounds",
                patch.id,
                patch.range()
            );
            continue;
        }

        buffer.edit(patch.start..patch.end, patch.replacement.as_str());
        previous = Some(patch);
    }

    buffer.to_string()
}
