//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `TranscriptStore` - Session and message persistence
//! - `GenerationBackend` - Streaming call to the generation service
//! - `SessionValidator` - Bearer token validation

mod generation_backend;
mod session_validator;
mod transcript_store;

pub use generation_backend::{
    GenerationBackend, GenerationRequest, HistoryTurn, LineStream, UpstreamError,
};
pub use session_validator::SessionValidator;
pub use transcript_store::TranscriptStore;
