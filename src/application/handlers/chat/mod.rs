//! Chat handlers.

mod manage_sessions;
mod relay_engine;
mod session_coordinator;
mod truncate_history;

pub use manage_sessions::{
    CreateSessionCommand, DeleteSessionCommand, RenameSessionCommand, SessionManager,
};
pub use relay_engine::{
    RelayEngine, RelayEvent, RelayOptions, SendMessageCommand, TurnHandle, TurnOutcome,
};
pub use session_coordinator::SessionCoordinator;
pub use truncate_history::{TruncateHistoryCommand, TruncateHistoryHandler};
