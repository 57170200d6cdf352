//! Per-turn state machine and transcript accumulator.
//!
//! ```text
//! Idle ──► Streaming ──► Done
//!   │          ├───────► Errored
//!   │          └───────► Cancelled
//!   ├──────────────────► Errored     (upstream could not be opened)
//!   └──────────────────► Cancelled   (client left before upstream opened)
//! ```
//!
//! Every terminal state persists whatever was accumulated, so a turn
//! always ends with exactly one assistant message.

use crate::domain::foundation::{SessionId, StateMachine, ValidationError};
use serde::Serialize;
use std::fmt;

use super::message::{unescape_newlines, ChatMessage};
use super::stream_event::StreamEvent;

/// Lifecycle of one relay turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    Streaming,
    Done,
    Errored,
    Cancelled,
}

impl StateMachine for TurnState {
    fn valid_transitions(&self) -> Vec<Self> {
        use TurnState::*;
        match self {
            Idle => vec![Streaming, Errored, Cancelled],
            Streaming => vec![Done, Errored, Cancelled],
            Done | Errored | Cancelled => vec![],
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnState::Idle => "idle",
            TurnState::Streaming => "streaming",
            TurnState::Done => "done",
            TurnState::Errored => "errored",
            TurnState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Assistant output collected during a turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnTranscript {
    text: String,
    citations: Option<serde_json::Value>,
    token_events: u32,
}

impl TurnTranscript {
    /// Raw accumulated text, escapes not yet resolved.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn citations(&self) -> Option<&serde_json::Value> {
        self.citations.as_ref()
    }

    pub fn token_events(&self) -> u32 {
        self.token_events
    }

    /// Builds the assistant message for `session_id`, consuming the transcript.
    pub fn into_assistant_message(self, session_id: SessionId) -> ChatMessage {
        let token_count = i32::try_from(self.token_events).unwrap_or(i32::MAX);
        ChatMessage::assistant(
            session_id,
            unescape_newlines(&self.text),
            self.citations,
            Some(token_count),
        )
    }
}

/// A single relay turn: current state plus the transcript built so far.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    state: TurnState,
    transcript: TurnTranscript,
}

impl Default for Turn {
    fn default() -> Self {
        Self::new()
    }
}

impl Turn {
    pub fn new() -> Self {
        Self {
            state: TurnState::Idle,
            transcript: TurnTranscript::default(),
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn transcript(&self) -> &TurnTranscript {
        &self.transcript
    }

    /// Upstream connection is open and lines are flowing.
    pub fn begin_streaming(&mut self) -> Result<(), ValidationError> {
        self.state = self.state.transition_to(TurnState::Streaming)?;
        Ok(())
    }

    /// Folds one stream event into the turn.
    ///
    /// Tokens append to the text, citations replace any earlier payload,
    /// `Done` and `UpstreamError` end the turn.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` on `state_transition` when the turn is not
    /// streaming, so nothing is accepted after a terminal state.
    pub fn record(&mut self, event: &StreamEvent) -> Result<TurnState, ValidationError> {
        if self.state != TurnState::Streaming {
            return Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot record {:?} while {}", event, self.state),
            ));
        }

        match event {
            StreamEvent::Token { text } => {
                self.transcript.text.push_str(text);
                self.transcript.token_events += 1;
            }
            StreamEvent::Citation { payload, .. } => {
                self.transcript.citations = Some(payload.clone());
            }
            StreamEvent::Done => {
                self.state = self.state.transition_to(TurnState::Done)?;
            }
            StreamEvent::UpstreamError { .. } => {
                self.state = self.state.transition_to(TurnState::Errored)?;
            }
        }
        Ok(self.state)
    }

    /// Ends the turn as failed (transport error, timeout, early close).
    pub fn fail(&mut self) -> Result<(), ValidationError> {
        self.state = self.state.transition_to(TurnState::Errored)?;
        Ok(())
    }

    /// Ends the turn because the client went away.
    pub fn cancel(&mut self) -> Result<(), ValidationError> {
        self.state = self.state.transition_to(TurnState::Cancelled)?;
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Splits the finished turn into its final state and transcript.
    pub fn into_parts(self) -> (TurnState, TurnTranscript) {
        (self.state, self.transcript)
    }
}
