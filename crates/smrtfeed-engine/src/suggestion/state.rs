use std::fmt;
use std::ops::Range;

use crate::editing::PatchId;
use crate::error::{RequestError, StoreError};

/// Monotonically increasing id of a generation request within one controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies one spawned save; only the newest token's result is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SaveToken(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionStatus {
    AwaitingResponse,
    Ready,
    Accepted,
    Declined,
    Cancelled,
    Failed,
}

impl SuggestionStatus {
    /// Statuses that count against the single-flight limit
    pub fn is_live(&self) -> bool {
        matches!(self, Self::AwaitingResponse | Self::Ready)
    }
}

/// A proposed, not yet committed patch
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSuggestion {
    pub request_id: RequestId,
    /// Captured at issue time in baseline coordinates; re-projected for display
    pub baseline_range: Range<usize>,
    pub selected_text: String,
    pub instruction: String,
    /// Set once the response has arrived
    pub proposed_text: Option<String>,
    pub status: SuggestionStatus,
}

/// Coarse state of the controller's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionState {
    Idle,
    AwaitingResponse,
    Ready,
}

/// Outcome of a completed background task, as seen by the presentation layer
#[derive(Debug)]
pub enum SuggestionEvent {
    /// The current request produced a replacement
    Ready {
        request_id: RequestId,
        baseline_range: Range<usize>,
        proposed_text: String,
        /// Where the suggestion sits in the rendered text right now
        overlay_anchor: Range<usize>,
    },
    /// The current request failed or timed out; the controller is idle again
    Failed {
        request_id: RequestId,
        error: RequestError,
    },
    Saved {
        token: SaveToken,
        version: u64,
    },
    /// The newest save failed; the committed patches are still in memory
    SaveFailed {
        token: SaveToken,
        error: StoreError,
    },
}

/// Returned from a successful accept or direct edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Committed {
    pub patch_id: PatchId,
    /// Save issued for the new log
    pub save: SaveToken,
}
