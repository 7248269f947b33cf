use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::editing::mapping::patches_touching;
use crate::editing::{
    AnnotatedDocument, LiveSelection, Patch, RawSelection, SelectionEvent, snap_to_patch_spans,
};
use crate::error::{EngineError, RequestError, StoreError, ValidationError};
use crate::io::{DocumentId, DocumentStore};
use crate::suggestion::service::{EngineOptions, GenerationRequest, GenerationService};
use crate::suggestion::state::{
    Committed, PendingSuggestion, RequestId, SaveToken, SuggestionEvent, SuggestionState,
    SuggestionStatus,
};

/// Result of a spawned task, delivered back to the controller
#[derive(Debug)]
enum Completion {
    Generated {
        request_id: RequestId,
        outcome: Result<String, RequestError>,
    },
    Saved {
        token: SaveToken,
        version: u64,
        /// `Ok(false)` when a newer version was already written and this save skipped
        outcome: Result<bool, StoreError>,
    },
}

/// Selection the next request will be issued for
#[derive(Debug, Clone, PartialEq)]
struct ActiveSelection {
    live: LiveSelection,
    text: String,
}

/// Drives one document through select → request → accept/decline.
///
/// All state changes happen on the caller's task. Generation calls and saves run
/// as spawned tokio tasks and report back through a channel; their results only
/// take effect when [`SuggestionController::next_event`] (or `try_next_event`)
/// delivers them, and only if their request id or save token is still current.
///
/// Spawning methods must be called from within a tokio runtime.
pub struct SuggestionController<G, S> {
    document_id: DocumentId,
    document: AnnotatedDocument,
    service: Arc<G>,
    store: Arc<S>,
    options: EngineOptions,

    selection: Option<ActiveSelection>,
    pending: Option<PendingSuggestion>,
    finished: Option<PendingSuggestion>,
    dropped_on_load: usize,

    next_request: u64,
    next_save: u64,
    current_save: Option<SaveToken>,
    /// Highest log version written so far; older saves starting late are skipped
    written_version: Arc<AtomicU64>,

    outstanding: usize,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<G, S> SuggestionController<G, S>
where
    G: GenerationService,
    S: DocumentStore,
{
    pub fn new(
        document_id: DocumentId,
        document: AnnotatedDocument,
        service: Arc<G>,
        store: Arc<S>,
        options: EngineOptions,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            document_id,
            document,
            service,
            store,
            options,
            selection: None,
            pending: None,
            finished: None,
            dropped_on_load: 0,
            next_request: 0,
            next_save: 0,
            current_save: None,
            written_version: Arc::new(AtomicU64::new(0)),
            outstanding: 0,
            completions_tx,
            completions_rx,
        }
    }

    /// Start a session on a new document. Nothing is written until the first save.
    pub fn create(
        document_id: DocumentId,
        baseline: &str,
        service: Arc<G>,
        store: Arc<S>,
        options: EngineOptions,
    ) -> Self {
        Self::new(
            document_id,
            AnnotatedDocument::new(baseline),
            service,
            store,
            options,
        )
    }

    /// Resume a persisted document
    pub async fn open(
        document_id: DocumentId,
        service: Arc<G>,
        store: Arc<S>,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let decoded = store.load(&document_id).await?;
        if decoded.dropped > 0 {
            log::warn!(
                "document {document_id}: dropped {} invalid change(s) on load",
                decoded.dropped
            );
        }
        log::info!(
            "opened document {document_id} with {} committed change(s)",
            decoded.log.len()
        );

        let mut controller = Self::new(
            document_id,
            AnnotatedDocument::from_log(decoded.log),
            service,
            store,
            options,
        );
        controller.dropped_on_load = decoded.dropped;
        Ok(controller)
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn document(&self) -> &AnnotatedDocument {
        &self.document
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Persisted change entries discarded by [`SuggestionController::open`]
    pub fn dropped_on_load(&self) -> usize {
        self.dropped_on_load
    }

    pub fn state(&self) -> SuggestionState {
        match self.pending.as_ref().map(|pending| pending.status) {
            Some(SuggestionStatus::AwaitingResponse) => SuggestionState::AwaitingResponse,
            Some(SuggestionStatus::Ready) => SuggestionState::Ready,
            _ => SuggestionState::Idle,
        }
    }

    pub fn pending(&self) -> Option<&PendingSuggestion> {
        self.pending.as_ref()
    }

    /// The most recently retired suggestion, with its terminal status
    pub fn last_finished(&self) -> Option<&PendingSuggestion> {
        self.finished.as_ref()
    }

    /// Live range of the current selection, if any
    pub fn selection(&self) -> Option<LiveSelection> {
        self.selection.as_ref().map(|selection| selection.live)
    }

    /// Spawned tasks whose results have not been delivered yet
    pub fn has_outstanding(&self) -> bool {
        self.outstanding > 0
    }

    /// Feed a raw selection event from the presentation layer.
    ///
    /// Clearing the selection never cancels an in-flight request.
    pub fn on_selection(&mut self, raw: &RawSelection) -> SelectionEvent {
        let event = self.document.track_selection(raw, &self.options.overlay);
        self.selection = match &event {
            SelectionEvent::SelectionChanged {
                selection, text, ..
            } => Some(ActiveSelection {
                live: *selection,
                text: text.clone(),
            }),
            SelectionEvent::SelectionCleared => None,
        };
        event
    }

    /// Ask for a replacement of the current selection.
    ///
    /// Supersedes any pending suggestion: a response to an older request is
    /// ignored when it arrives.
    pub fn request_suggestion(
        &mut self,
        instruction: impl Into<String>,
    ) -> Result<RequestId, EngineError> {
        let instruction = instruction.into();
        if instruction.trim().is_empty() {
            return Err(EngineError::InvalidRequest("instruction is blank"));
        }
        let Some(selection) = self.selection.clone() else {
            return Err(EngineError::InvalidRequest("no text is selected"));
        };

        let baseline_range = self.claim(selection.live.range())?;

        self.next_request += 1;
        let request_id = RequestId(self.next_request);
        if let Some(previous) = self.pending.take() {
            log::debug!("request {} superseded by {request_id}", previous.request_id);
            self.retire(previous, SuggestionStatus::Cancelled);
        }

        log::debug!("request {request_id}: awaiting response for baseline {baseline_range:?}");
        self.pending = Some(PendingSuggestion {
            request_id,
            baseline_range,
            selected_text: selection.text.clone(),
            instruction: instruction.clone(),
            proposed_text: None,
            status: SuggestionStatus::AwaitingResponse,
        });

        let request = GenerationRequest {
            selected_text: selection.text,
            instruction,
        };
        let service = Arc::clone(&self.service);
        let completions = self.completions_tx.clone();
        let deadline = self.options.generation_timeout;
        self.outstanding += 1;
        tokio::spawn(async move {
            let outcome =
                match tokio::time::timeout(deadline, service.generate_replacement(request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(RequestError::Timeout(deadline)),
                };
            // The controller may already be gone
            let _ = completions.send(Completion::Generated {
                request_id,
                outcome,
            });
        });

        Ok(request_id)
    }

    /// Wait for the next background result and apply it.
    ///
    /// Returns `None` right away when nothing is outstanding, and `None` after
    /// applying a stale or superseded result.
    pub async fn next_event(&mut self) -> Option<SuggestionEvent> {
        if self.outstanding == 0 {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        self.apply(completion)
    }

    /// Apply a result that has already been delivered, without waiting
    pub fn try_next_event(&mut self) -> Option<SuggestionEvent> {
        let completion = self.completions_rx.try_recv().ok()?;
        self.apply(completion)
    }

    /// Commit the ready suggestion and save the new log
    pub fn accept(&mut self) -> Result<Committed, EngineError> {
        let pending = self.take_ready()?;
        let replacement = pending.proposed_text.clone().unwrap_or_default();
        let patch = Patch::new(
            pending.baseline_range.start,
            pending.baseline_range.end,
            replacement,
        );

        match self.document.commit(patch) {
            Ok(patch_id) => {
                log::info!(
                    "request {}: committed patch {patch_id} over baseline {:?}",
                    pending.request_id,
                    pending.baseline_range
                );
                self.retire(pending, SuggestionStatus::Accepted);
                self.selection = None;
                let save = self.spawn_save();
                Ok(Committed { patch_id, save })
            }
            Err(err) => {
                log::warn!("request {}: suggestion went stale: {err}", pending.request_id);
                self.retire(pending, SuggestionStatus::Failed);
                Err(EngineError::StaleSuggestion(err))
            }
        }
    }

    /// Discard the ready suggestion without touching the log
    pub fn decline(&mut self) -> Result<(), EngineError> {
        let pending = self.take_ready()?;
        log::debug!("request {}: declined", pending.request_id);
        self.retire(pending, SuggestionStatus::Declined);
        Ok(())
    }

    /// Commit a replacement typed by the user over a live range.
    ///
    /// The range is widened to whole patch spans first, like a selection. A
    /// pending suggestion is left alone; if this edit overlaps it, accepting it
    /// later fails as stale.
    pub fn apply_edit(
        &mut self,
        live: Range<usize>,
        replacement: impl Into<String>,
    ) -> Result<Committed, EngineError> {
        if live.start > live.end {
            return Err(EngineError::InvalidRequest("edit range is inverted"));
        }
        let live = snap_to_patch_spans(live, self.document.log());
        let baseline = self.claim(live)?;
        let patch_id = self
            .document
            .commit(Patch::new(baseline.start, baseline.end, replacement))?;
        log::info!("committed direct edit {patch_id} over baseline {baseline:?}");
        self.selection = None;
        let save = self.spawn_save();
        Ok(Committed { patch_id, save })
    }

    /// Save the current log again, e.g. after a `SaveFailed`
    pub fn save_now(&mut self) -> SaveToken {
        self.spawn_save()
    }

    /// Live range of the pending suggestion against the current log
    pub fn overlay_anchor(&self) -> Option<Range<usize>> {
        self.pending
            .as_ref()
            .map(|pending| self.document.baseline_to_live(pending.baseline_range.clone()))
    }

    /// Baseline range a new patch over `live` would replace.
    ///
    /// Ranges that overlap a committed replacement are refused. An insertion maps
    /// to a single baseline offset, so covering its text would otherwise slip
    /// past the interval check and leave the inserted text in place.
    fn claim(&self, live: Range<usize>) -> Result<Range<usize>, EngineError> {
        let log = self.document.log();
        let baseline = self.document.live_to_baseline(live.clone())?;
        if let Some(span) = patches_touching(live, log).into_iter().next() {
            return Err(ValidationError::Overlap {
                candidate: baseline,
                existing: span.id,
                existing_range: span.baseline,
            }
            .into());
        }
        self.document.check_range(baseline.clone())?;
        Ok(baseline)
    }

    fn take_ready(&mut self) -> Result<PendingSuggestion, EngineError> {
        match self.pending.take() {
            Some(pending) if pending.status == SuggestionStatus::Ready => Ok(pending),
            other => {
                self.pending = other;
                Err(EngineError::NoSuggestion)
            }
        }
    }

    fn retire(&mut self, mut suggestion: PendingSuggestion, status: SuggestionStatus) {
        suggestion.status = status;
        self.finished = Some(suggestion);
    }

    fn spawn_save(&mut self) -> SaveToken {
        self.next_save += 1;
        let token = SaveToken(self.next_save);
        self.current_save = Some(token);

        let store = Arc::clone(&self.store);
        let written_version = Arc::clone(&self.written_version);
        let id = self.document_id.clone();
        let log = self.document.log().clone();
        let version = log.version();
        let completions = self.completions_tx.clone();
        let deadline = self.options.save_timeout;
        self.outstanding += 1;
        tokio::spawn(async move {
            let outcome = if written_version.load(Ordering::Acquire) > version {
                Ok(false)
            } else {
                match tokio::time::timeout(deadline, store.save(&id, &log)).await {
                    Ok(Ok(())) => {
                        written_version.fetch_max(version, Ordering::AcqRel);
                        Ok(true)
                    }
                    Ok(Err(err)) => Err(err),
                    Err(_) => Err(StoreError::Timeout(deadline)),
                }
            };
            let _ = completions.send(Completion::Saved {
                token,
                version,
                outcome,
            });
        });

        token
    }

    fn apply(&mut self, completion: Completion) -> Option<SuggestionEvent> {
        self.outstanding = self.outstanding.saturating_sub(1);
        match completion {
            Completion::Generated {
                request_id,
                outcome,
            } => self.apply_generated(request_id, outcome),
            Completion::Saved {
                token,
                version,
                outcome,
            } => self.apply_saved(token, version, outcome),
        }
    }

    fn apply_generated(
        &mut self,
        request_id: RequestId,
        outcome: Result<String, RequestError>,
    ) -> Option<SuggestionEvent> {
        let is_current = self.pending.as_ref().is_some_and(|pending| {
            pending.request_id == request_id && pending.status == SuggestionStatus::AwaitingResponse
        });
        if !is_current {
            log::debug!("request {request_id}: discarding stale response");
            return None;
        }

        match outcome {
            Ok(proposed_text) => {
                let pending = self.pending.as_mut()?;
                pending.status = SuggestionStatus::Ready;
                pending.proposed_text = Some(proposed_text.clone());
                let baseline_range = pending.baseline_range.clone();
                let overlay_anchor = self.document.baseline_to_live(baseline_range.clone());
                log::debug!("request {request_id}: ready at live {overlay_anchor:?}");
                Some(SuggestionEvent::Ready {
                    request_id,
                    baseline_range,
                    proposed_text,
                    overlay_anchor,
                })
            }
            Err(error) => {
                log::warn!("request {request_id}: {error}");
                if let Some(pending) = self.pending.take() {
                    self.retire(pending, SuggestionStatus::Failed);
                }
                Some(SuggestionEvent::Failed { request_id, error })
            }
        }
    }

    fn apply_saved(
        &mut self,
        token: SaveToken,
        version: u64,
        outcome: Result<bool, StoreError>,
    ) -> Option<SuggestionEvent> {
        if self.current_save != Some(token) {
            log::debug!("save {token:?}: superseded by a newer save");
            // An older write landing after the newest one finished leaves the store behind
            if matches!(outcome, Ok(true))
                && self.current_save.is_none()
                && version < self.document.version()
            {
                log::debug!("save {token:?}: wrote version {version} late, saving again");
                self.spawn_save();
            }
            return None;
        }
        self.current_save = None;

        match outcome {
            Ok(_) => {
                log::info!("saved document {} at version {version}", self.document_id);
                Some(SuggestionEvent::Saved { token, version })
            }
            Err(error) => {
                log::warn!("saving document {} failed: {error}", self.document_id);
                Some(SuggestionEvent::SaveFailed { token, error })
            }
        }
    }
}
