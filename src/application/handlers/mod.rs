//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod chat;

pub use chat::{
    CreateSessionCommand, DeleteSessionCommand, RelayEngine, RelayEvent, RelayOptions,
    RenameSessionCommand, SendMessageCommand, SessionCoordinator, SessionManager,
    TruncateHistoryCommand, TruncateHistoryHandler, TurnHandle, TurnOutcome,
};
