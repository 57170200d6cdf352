//! HTTP adapter for chat endpoints.

mod dto;
mod handlers;
mod routes;
mod sse;

pub use dto::{
    CreateSessionRequest, ErrorResponse, MessageResponse, RenameSessionRequest, RollbackRequest,
    RollbackResponse, SendMessageRequest, SessionResponse,
};
pub use handlers::ChatHandlers;
pub use routes::{session_routes, stream_routes};
pub use sse::turn_event_stream;
