//! Relay engine.
//!
//! Runs one conversation turn: persists the user message, opens the
//! generation backend, republishes classified lines to the client channel
//! and persists the assistant message once the stream reaches a terminal
//! state.
//!
//! # Ordering
//!
//! 1. user message persisted, session touched (before `stream_turn` returns)
//! 2. upstream request dispatched (on the spawned turn task)
//! 3. assistant message persisted, session touched again
//! 4. outbound channel closed
//!
//! Client delivery is best-effort. The store is the durability boundary, so
//! step 3 runs whether the turn finished, failed or was abandoned.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::chat::{
    classify_line, validate_content, ChatError, ChatMessage, StreamEvent, Turn, TurnState,
    DONE_SENTINEL,
};
use crate::domain::foundation::{SessionId, Timestamp, UserId};
use crate::ports::{
    GenerationBackend, GenerationRequest, HistoryTurn, LineStream, TranscriptStore,
    UpstreamError,
};

use super::session_coordinator::SessionCoordinator;

/// Tunables for the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOptions {
    /// Bound of the per-turn outbound channel.
    pub channel_capacity: usize,
    /// Maximum user message length, in characters.
    pub max_message_length: usize,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            max_message_length: 10_000,
        }
    }
}

/// Command to send a user message and stream the reply.
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub owner: UserId,
    /// Existing session, or `None` to open a new one.
    pub session_id: Option<SessionId>,
    pub content: String,
}

/// One event on the client-facing channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// First event of every turn.
    Session { session_id: SessionId },
    /// Raw upstream payload (token text or citation JSON), forwarded as-is.
    Payload(String),
    /// Upstream finished normally.
    Done,
    /// Turn failed; carries a client-safe description.
    Error(String),
}

impl RelayEvent {
    /// Text carried in the SSE `data` field.
    pub fn into_data(self) -> String {
        match self {
            RelayEvent::Session { session_id } => {
                json!({ "sessionId": session_id.to_string() }).to_string()
            }
            RelayEvent::Payload(text) => text,
            RelayEvent::Done => DONE_SENTINEL.to_string(),
            RelayEvent::Error(message) => format!("Error: {}", message),
        }
    }
}

/// Summary recorded for every finished turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub session_id: SessionId,
    pub state: TurnState,
    pub token_events: u32,
    pub assistant_persisted: bool,
    pub error: Option<ChatError>,
}

/// Handle to an in-flight turn.
///
/// Dropping `events` cancels the turn; `completion` still resolves once
/// the assistant message has been written.
#[derive(Debug)]
pub struct TurnHandle {
    pub session_id: SessionId,
    pub events: mpsc::Receiver<RelayEvent>,
    pub completion: JoinHandle<TurnOutcome>,
}

/// Orchestrates coordinator, backend and store for streaming turns.
#[derive(Clone)]
pub struct RelayEngine {
    coordinator: SessionCoordinator,
    store: Arc<dyn TranscriptStore>,
    backend: Arc<dyn GenerationBackend>,
    options: RelayOptions,
}

impl RelayEngine {
    pub fn new(
        store: Arc<dyn TranscriptStore>,
        backend: Arc<dyn GenerationBackend>,
        options: RelayOptions,
    ) -> Self {
        Self {
            coordinator: SessionCoordinator::new(store.clone()),
            store,
            backend,
            options,
        }
    }

    /// Starts a turn.
    ///
    /// Everything up to and including the first session touch happens
    /// before this returns; the upstream call runs on its own task.
    ///
    /// # Errors
    ///
    /// - `Validation` if the content is blank or too long
    /// - `NotFoundOrForbidden` if `session_id` is not the owner's live session
    /// - `PersistenceFailure` if the user message cannot be written; the
    ///   backend is never contacted in that case
    pub async fn stream_turn(&self, cmd: SendMessageCommand) -> Result<TurnHandle, ChatError> {
        validate_content(&cmd.content, self.options.max_message_length)?;

        let session = self
            .coordinator
            .resolve_or_create(&cmd.owner, cmd.session_id, &cmd.content)
            .await?;
        let session_id = *session.id();

        let user_message = ChatMessage::user(session_id, cmd.content.clone());
        self.store.insert_message(&user_message).await?;
        self.coordinator.touch(&session_id).await?;

        let history: Vec<HistoryTurn> = self
            .coordinator
            .load_context(&session_id)
            .await?
            .iter()
            .filter(|m| m.id() != user_message.id())
            .map(HistoryTurn::from)
            .collect();
        let request = GenerationRequest::new(cmd.content, history);

        let (tx, rx) = mpsc::channel(self.options.channel_capacity.max(1));
        tx.try_send(RelayEvent::Session { session_id })
            .map_err(|_| ChatError::ClientDisconnected)?;

        tracing::debug!(
            session_id = %session_id,
            owner = %cmd.owner,
            history_len = request.history.len(),
            "Dispatching turn"
        );

        let completion = tokio::spawn(run_turn(
            self.backend.clone(),
            self.store.clone(),
            session_id,
            request,
            tx,
        ));

        Ok(TurnHandle {
            session_id,
            events: rx,
            completion,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Turn task
// ════════════════════════════════════════════════════════════════════════════

async fn run_turn(
    backend: Arc<dyn GenerationBackend>,
    store: Arc<dyn TranscriptStore>,
    session_id: SessionId,
    request: GenerationRequest,
    tx: mpsc::Sender<RelayEvent>,
) -> TurnOutcome {
    let cancel = CancellationToken::new();
    let mut turn = Turn::new();

    let opened = tokio::select! {
        biased;
        _ = tx.closed() => None,
        opened = backend.open(request, cancel.clone()) => Some(opened),
    };

    let error = match opened {
        None => abandon(&mut turn),
        Some(Err(e)) => fail(&mut turn, &tx, ChatError::from(e)).await,
        Some(Ok(mut lines)) => match turn.begin_streaming() {
            Ok(()) => pump(&mut turn, &mut lines, &tx).await,
            Err(e) => fail(&mut turn, &tx, ChatError::upstream_unavailable(e.to_string())).await,
        },
    };
    cancel.cancel();

    let (state, transcript) = turn.into_parts();
    let token_events = transcript.token_events();
    let assistant = transcript.into_assistant_message(session_id);

    let assistant_persisted = match store.insert_message(&assistant).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(
                session_id = %session_id,
                error = %e,
                "Failed to persist assistant message"
            );
            false
        }
    };
    if let Err(e) = store.touch_session(&session_id, Timestamp::now()).await {
        tracing::warn!(session_id = %session_id, error = %e, "Failed to touch session");
    }

    match (&state, &error) {
        (TurnState::Done, _) => tracing::info!(
            session_id = %session_id,
            state = %state,
            token_events,
            "Turn completed"
        ),
        (_, Some(err)) => tracing::warn!(
            session_id = %session_id,
            state = %state,
            token_events,
            error = %err,
            "Turn ended early"
        ),
        (_, None) => tracing::warn!(
            session_id = %session_id,
            state = %state,
            token_events,
            "Turn ended without a recorded cause"
        ),
    }

    drop(tx);

    TurnOutcome {
        session_id,
        state,
        token_events,
        assistant_persisted,
        error,
    }
}

/// Reads lines until a terminal state; returns the failure, if any.
async fn pump(
    turn: &mut Turn,
    lines: &mut LineStream,
    tx: &mpsc::Sender<RelayEvent>,
) -> Option<ChatError> {
    loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => return abandon(turn),
            next = lines.next() => next,
        };

        let event = match next {
            Some(Ok(line)) => match classify_line(&line) {
                Some(event) => event,
                None => continue,
            },
            Some(Err(UpstreamError::Status { status })) => StreamEvent::UpstreamError { status },
            Some(Err(e)) => return fail(turn, tx, ChatError::from(e)).await,
            None => {
                let err = ChatError::upstream_unavailable("upstream closed before completion");
                return fail(turn, tx, err).await;
            }
        };

        let state = match turn.record(&event) {
            Ok(state) => state,
            Err(e) => return fail(turn, tx, ChatError::upstream_unavailable(e.to_string())).await,
        };

        let outbound = match event {
            StreamEvent::Token { text } => RelayEvent::Payload(text),
            StreamEvent::Citation { raw, .. } => RelayEvent::Payload(raw),
            StreamEvent::Done => RelayEvent::Done,
            StreamEvent::UpstreamError { status } => {
                let err = ChatError::from(UpstreamError::Status { status });
                emit_error(tx, &err).await;
                return Some(err);
            }
        };

        if tx.send(outbound).await.is_err() && !turn.is_finished() {
            return abandon(turn);
        }
        if state == TurnState::Done {
            return None;
        }
    }
}

fn abandon(turn: &mut Turn) -> Option<ChatError> {
    if let Err(e) = turn.cancel() {
        tracing::debug!(error = %e, "Turn already finished when client left");
        return None;
    }
    Some(ChatError::ClientDisconnected)
}

async fn fail(turn: &mut Turn, tx: &mpsc::Sender<RelayEvent>, err: ChatError) -> Option<ChatError> {
    if let Err(e) = turn.fail() {
        tracing::debug!(error = %e, "Turn already finished when failure arrived");
    }
    emit_error(tx, &err).await;
    Some(err)
}

async fn emit_error(tx: &mpsc::Sender<RelayEvent>, err: &ChatError) {
    // Best-effort: the client may already be gone.
    let _ = tx.send(RelayEvent::Error(err.to_string())).await;
}
