//! Suggestion requests: single-flight generation, accept and decline.
//!
//! ```text
//! Idle ──request──▶ AwaitingResponse ──response──▶ Ready ──accept──▶ Idle (patch committed, save spawned)
//!                        │   ▲                       │
//!                        │   └──request (supersede)──┤
//!                        └──error/timeout──▶ Idle    └──decline──▶ Idle
//! ```
//!
//! At most one suggestion is awaiting a response or ready at any time. A response
//! is applied only if its request id is still the current one.

mod controller;
mod service;
mod state;

pub use controller::SuggestionController;
pub use service::{EngineOptions, GenerationRequest, GenerationService};
pub use state::{
    Committed, PendingSuggestion, RequestId, SaveToken, SuggestionEvent, SuggestionState,
    SuggestionStatus,
};
