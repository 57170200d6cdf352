//! Chat Relay - streaming conversation relay.
//!
//! Accepts a user message, forwards it with the session history to a
//! generation backend, republishes the streamed reply to the client as
//! Server-Sent Events and records both sides of the turn.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
