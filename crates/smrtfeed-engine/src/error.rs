use std::ops::Range;
use std::time::Duration;

use crate::editing::PatchId;
use crate::io::DocumentId;

/// A candidate patch that cannot join a patch log
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("patch range {start}..{end} is inverted")]
    InvertedRange { start: usize, end: usize },
    #[error("patch range {range:?} exceeds baseline length {len}")]
    OutOfBounds { range: Range<usize>, len: usize },
    #[error("patch offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
    #[error("patch range {candidate:?} overlaps committed patch {existing} at {existing_range:?}")]
    Overlap {
        candidate: Range<usize>,
        existing: PatchId,
        existing_range: Range<usize>,
    },
}

/// A live offset that has no single baseline counterpart
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("live offset {offset} falls inside the rendered span {live:?} of patch {patch}")]
    InsidePatch {
        offset: usize,
        patch: PatchId,
        live: Range<usize>,
    },
    #[error("live offset {offset} is past the end of the rendered text ({len})")]
    OutOfBounds { offset: usize, len: usize },
}

/// Failure reported by (or on behalf of) the text-generation service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("generation service failed: {0}")]
    Service(String),
    #[error("generation request timed out after {0:?}")]
    Timeout(Duration),
}

/// The persisted record as a whole could not be read
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("persisted record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("persisted record has no `content` string")]
    MissingContent,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(DocumentId),
    #[error("invalid document id: {0:?}")]
    InvalidId(String),
    #[error("save did not finish within {0:?}")]
    Timeout(Duration),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// Errors surfaced by the suggestion controller
///
/// Validation, stale-suggestion and request failures are recoverable: they end the
/// current pending suggestion and leave the patch log untouched.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("suggestion went stale before it was accepted: {0}")]
    StaleSuggestion(ValidationError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("document not found: {0}")]
    NotFound(DocumentId),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error("persistence failed: {0}")]
    Store(StoreError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("cannot request a suggestion: {0}")]
    InvalidRequest(&'static str),
    #[error("no suggestion is ready to accept or decline")]
    NoSuggestion,
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            StoreError::Serialization(err) => EngineError::Serialization(err),
            other => EngineError::Store(other),
        }
    }
}
