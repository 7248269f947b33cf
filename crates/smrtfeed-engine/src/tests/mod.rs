//! Shared helpers for unit tests

use std::collections::HashMap;
use std::sync::Mutex;

use tempfile::TempDir;
use tokio::sync::oneshot;

use crate::editing::{Patch, PatchLog, RawSelection, Rect};
use crate::error::RequestError;
use crate::suggestion::{GenerationRequest, GenerationService};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Temporary directory for file-store tests
pub fn create_test_store_dir() -> TempDir {
    TempDir::new().unwrap()
}

/// "The quick fox jumps over the lazy dog." with two replacements committed
pub fn sample_log() -> PatchLog {
    PatchLog::new("The quick fox jumps over the lazy dog.")
        .add_patch(Patch::new(4, 9, "slow"))
        .unwrap()
        .add_patch(Patch::new(14, 19, "leaps"))
        .unwrap()
}

/// A raw selection with fixed, roomy geometry
pub fn select(anchor: usize, focus: usize) -> RawSelection {
    RawSelection {
        anchor,
        focus,
        bounds: Rect::new(40.0, 300.0, 120.0, 18.0),
        viewport: Rect::new(0.0, 0.0, 800.0, 600.0),
    }
}

type Reply = Result<String, RequestError>;

/// Generation service whose replies are released by the test, keyed by instruction
#[derive(Default)]
pub struct ScriptedGenerator {
    gates: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to `instruction` once the returned sender fires
    pub fn gate(&self, instruction: &str) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .insert(instruction.to_string(), rx);
        tx
    }

    /// Reply to `instruction` as soon as it is asked
    pub fn respond(&self, instruction: &str, reply: Reply) {
        let _ = self.gate(instruction).send(reply);
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl GenerationService for ScriptedGenerator {
    async fn generate_replacement(&self, request: GenerationRequest) -> Result<String, RequestError> {
        let gate = self.gates.lock().unwrap().remove(&request.instruction);
        self.requests.lock().unwrap().push(request.clone());
        match gate {
            Some(gate) => gate
                .await
                .unwrap_or_else(|_| Err(RequestError::Service("gate dropped".to_string()))),
            None => Err(RequestError::Service(format!(
                "no reply scripted for {:?}",
                request.instruction
            ))),
        }
    }
}
