//! In-memory adapters for tests and local development.

mod transcript_store;

pub use transcript_store::InMemoryTranscriptStore;
