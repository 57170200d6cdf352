//! Server-Sent Events rendering of a turn.
//!
//! Each `RelayEvent` becomes one SSE `data:` frame. When the client goes
//! away axum drops the stream, which drops the receiver and lets the turn
//! task observe the disconnect.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;

use crate::application::handlers::TurnHandle;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Turns a running turn into an SSE response body.
///
/// The completion handle is detached; the turn task persists the assistant
/// message whether or not anyone is still listening.
pub fn turn_event_stream(
    handle: TurnHandle,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let TurnHandle { events, .. } = handle;
    let stream = ReceiverStream::new(events)
        .map(|event| {
            Ok::<_, Infallible>(Event::default().data(frame_data(event.into_data())))
        });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

/// Folds carriage returns into newlines.
///
/// An SSE field cannot hold a bare `\r`; `\n` is split by axum into
/// consecutive `data:` lines, which clients rejoin with `\n`.
fn frame_data(data: String) -> String {
    if data.contains('\r') {
        data.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(frame_data("Hello".to_string()), "Hello");
    }

    #[test]
    fn carriage_returns_become_newlines() {
        assert_eq!(frame_data("a\rb\r\nc".to_string()), "a\nb\nc");
    }

    #[test]
    fn framed_error_text_is_accepted_by_event() {
        let data = frame_data("Error: upstream said\r\nno".to_string());
        let _ = Event::default().data(data);
    }
}
