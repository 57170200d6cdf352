//! Adapters - Implementations of port interfaces.
//!
//! - `postgres` - Transcript store on PostgreSQL
//! - `memory` - Transcript store in process memory
//! - `upstream` - Streaming HTTP client for the generation backend
//! - `auth` - Bearer token validators
//! - `http` - axum routes, SSE and auth middleware

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod upstream;

pub use auth::{JwtSessionValidator, MockSessionValidator};
pub use memory::InMemoryTranscriptStore;
pub use postgres::PostgresTranscriptStore;
pub use upstream::{HttpBackendConfig, HttpGenerationBackend};
