use std::future::Future;
use std::time::Duration;

use smrtfeed_config::Config;

use crate::editing::OverlayMetrics;
use crate::error::RequestError;

/// What the generation service is asked to rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub selected_text: String,
    pub instruction: String,
}

/// External text-generation collaborator.
///
/// The returned text is an opaque plain-text replacement; the engine never parses
/// it. Implementations own prompts, endpoints and credentials.
pub trait GenerationService: Send + Sync + 'static {
    fn generate_replacement(
        &self,
        request: GenerationRequest,
    ) -> impl Future<Output = Result<String, RequestError>> + Send;
}

/// Runtime knobs of a suggestion controller
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Deadline for one generation call
    pub generation_timeout: Duration,
    /// Deadline for one save
    pub save_timeout: Duration,
    pub overlay: OverlayMetrics,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            generation_timeout: config.generation.timeout(),
            save_timeout: config.save_timeout(),
            overlay: OverlayMetrics::from(&config.overlay),
        }
    }
}
