//! Chat domain - sessions, messages, stream events and the per-turn state machine.

mod errors;
mod message;
mod session;
mod stream_event;
mod turn;

pub use errors::ChatError;
pub use message::{unescape_newlines, validate_content, ChatMessage, Role};
pub use session::{derive_title, ChatSession, DEFAULT_TITLE, MAX_TITLE_LENGTH};
pub use stream_event::{classify_line, StreamEvent, DATA_PREFIX, DONE_SENTINEL};
pub use turn::{Turn, TurnState, TurnTranscript};
