//! PostgreSQL adapters - Database implementations for repository ports.

mod transcript_store;

pub use transcript_store::PostgresTranscriptStore;
