#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use smrtfeed_engine::editing::{PatchLog, RawSelection, Rect};
use smrtfeed_engine::io::{DecodedDocument, DocumentId, DocumentStore, MemoryStore};
use smrtfeed_engine::{
    EngineOptions, GenerationRequest, GenerationService, RequestError, StoreError,
    SuggestionController, SuggestionEvent,
};
use tokio::sync::oneshot;

pub const TEXT: &str = "The quick fox jumps over the lazy dog.";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn doc_id(id: &str) -> DocumentId {
    DocumentId::new(id).unwrap()
}

pub fn select(anchor: usize, focus: usize) -> RawSelection {
    RawSelection {
        anchor,
        focus,
        bounds: Rect::new(40.0, 300.0, 120.0, 18.0),
        viewport: Rect::new(0.0, 0.0, 800.0, 600.0),
    }
}

type Reply = Result<String, RequestError>;

/// Replies are keyed by instruction and released by the test
#[derive(Default)]
pub struct ScriptedGenerator {
    gates: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
}

impl ScriptedGenerator {
    pub fn gate(&self, instruction: &str) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .insert(instruction.to_string(), rx);
        tx
    }

    pub fn respond(&self, instruction: &str, reply: Reply) {
        let _ = self.gate(instruction).send(reply);
    }
}

impl GenerationService for ScriptedGenerator {
    async fn generate_replacement(&self, request: GenerationRequest) -> Result<String, RequestError> {
        let gate = self.gates.lock().unwrap().remove(&request.instruction);
        match gate {
            Some(gate) => gate
                .await
                .unwrap_or_else(|_| Err(RequestError::Service("gate dropped".to_string()))),
            None => Err(RequestError::Service("nothing scripted".to_string())),
        }
    }
}

/// Memory store whose saves can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl DocumentStore for FlakyStore {
    async fn load(&self, id: &DocumentId) -> Result<DecodedDocument, StoreError> {
        self.inner.load(id).await
    }

    async fn save(&self, id: &DocumentId, log: &PatchLog) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.save(id, log).await
    }
}

/// Memory store whose saves can be held back
#[derive(Default)]
pub struct StallingStore {
    pub inner: MemoryStore,
    held: Mutex<Option<oneshot::Receiver<()>>>,
    stall_every_save: AtomicBool,
}

impl StallingStore {
    /// The next save waits until the returned sender fires or is dropped
    pub fn hold_next_save(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.held.lock().unwrap() = Some(rx);
        tx
    }

    /// Every save from now on never finishes
    pub fn stall_every_save(&self) {
        self.stall_every_save.store(true, Ordering::SeqCst);
    }
}

impl DocumentStore for StallingStore {
    async fn load(&self, id: &DocumentId) -> Result<DecodedDocument, StoreError> {
        self.inner.load(id).await
    }

    async fn save(&self, id: &DocumentId, log: &PatchLog) -> Result<(), StoreError> {
        if self.stall_every_save.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let held = self.held.lock().unwrap().take();
        if let Some(held) = held {
            let _ = held.await;
        }
        self.inner.save(id, log).await
    }
}

pub type Controller<S> = SuggestionController<ScriptedGenerator, S>;

pub fn new_controller<S: DocumentStore>(
    generator: &Arc<ScriptedGenerator>,
    store: &Arc<S>,
) -> Controller<S> {
    init_logging();
    SuggestionController::create(
        doc_id("essay"),
        TEXT,
        Arc::clone(generator),
        Arc::clone(store),
        EngineOptions::default(),
    )
}

/// Deliver completions until a generation result shows up
pub async fn next_suggestion_event<S: DocumentStore>(
    controller: &mut Controller<S>,
) -> Option<SuggestionEvent> {
    while controller.has_outstanding() {
        if let Some(event @ (SuggestionEvent::Ready { .. } | SuggestionEvent::Failed { .. })) =
            controller.next_event().await
        {
            return Some(event);
        }
    }
    None
}

/// Deliver completions until a save result shows up
pub async fn next_save_event<S: DocumentStore>(
    controller: &mut Controller<S>,
) -> Option<SuggestionEvent> {
    while controller.has_outstanding() {
        if let Some(event @ (SuggestionEvent::Saved { .. } | SuggestionEvent::SaveFailed { .. })) =
            controller.next_event().await
        {
            return Some(event);
        }
    }
    None
}
