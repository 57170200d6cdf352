//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, error types and the state machine trait
//! used across the chat relay domain.

mod auth;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{MessageId, SessionId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
