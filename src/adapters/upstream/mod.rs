//! Upstream adapters - the HTTP generation backend and its line framing.

mod http_backend;
mod line_buffer;

pub use http_backend::{HttpBackendConfig, HttpGenerationBackend};
pub use line_buffer::{line_stream, LineBuffer, StreamLimits, DEFAULT_MAX_LINE_LENGTH};
