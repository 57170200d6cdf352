//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `chat` - Sessions, messages, stream event classification and turn lifecycle
pub mod chat;
pub mod foundation;
