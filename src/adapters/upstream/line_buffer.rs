//! Reassembles lines from arbitrarily chunked bodies.

use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::ports::{LineStream, UpstreamError};

/// Longest line accepted from an upstream body by default (1 MiB).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Byte buffer that yields complete lines as chunks arrive.
///
/// Lines end at `\n`, `\r\n` or a lone `\r`, so no yielded line ever
/// contains a carriage return. Bytes are kept raw until a full line is
/// present, so multi-byte UTF-8 sequences split across chunks decode
/// correctly.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no terminator.
    scanned: usize,
    /// The previous line ended in `\r`; a leading `\n` belongs to it.
    after_cr: bool,
    max_line_length: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            pending: Vec::new(),
            scanned: 0,
            after_cr: false,
            max_line_length,
        }
    }

    /// Appends a chunk and drains every line it completed.
    ///
    /// # Errors
    ///
    /// Returns `Transport` once a line grows past the length limit.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, UpstreamError> {
        let mut lines = Vec::new();
        self.push_into(chunk, &mut lines)?;
        Ok(lines)
    }

    /// Like [`push`](Self::push), but lines completed before an over-long
    /// line are still delivered to `lines`.
    pub fn push_into<L>(&mut self, chunk: &[u8], lines: &mut L) -> Result<(), UpstreamError>
    where
        L: Extend<String>,
    {
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        loop {
            if self.after_cr && start < self.pending.len() {
                if self.pending[start] == b'\n' {
                    start += 1;
                }
                self.after_cr = false;
            }

            let from = start.max(self.scanned);
            let Some(offset) = self.pending[from..]
                .iter()
                .position(|&b| b == b'\n' || b == b'\r')
            else {
                self.scanned = self.pending.len();
                break;
            };

            let end = from + offset;
            self.check_length(end - start)?;
            self.after_cr = self.pending[end] == b'\r';
            lines.extend(Some(decode_line(&self.pending[start..end])));
            start = end + 1;
        }

        self.pending.drain(..start);
        self.scanned -= start;
        self.check_length(self.pending.len())
    }

    /// Flushes a final unterminated line, if any.
    pub fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(decode_line(&self.pending))
        }
    }

    fn check_length(&self, len: usize) -> Result<(), UpstreamError> {
        if len > self.max_line_length {
            return Err(UpstreamError::transport(format!(
                "upstream line exceeds {} bytes",
                self.max_line_length
            )));
        }
        Ok(())
    }
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Bounds applied while reading an upstream body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLimits {
    /// Longest allowed gap between two body chunks.
    pub read_timeout: Duration,
    /// Longest allowed line, terminator excluded.
    pub max_line_length: usize,
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(300),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

struct LineState<S> {
    body: Pin<Box<S>>,
    buffer: Option<LineBuffer>,
    ready: VecDeque<String>,
    failure: Option<UpstreamError>,
    cancel: CancellationToken,
    read_timeout: Duration,
}

impl<S> LineState<S> {
    fn fail(mut self, error: UpstreamError) -> Option<(Result<String, UpstreamError>, Self)> {
        self.buffer = None;
        self.ready.clear();
        Some((Err(error), self))
    }
}

/// Turns a chunked body into a cancellable stream of lines.
///
/// The stream ends as soon as `cancel` fires, dropping the body. A body
/// error, an over-long line, or a gap between chunks longer than
/// `limits.read_timeout` is yielded once, after which the stream ends.
pub fn line_stream<S, B, E>(
    body: S,
    cancel: CancellationToken,
    limits: StreamLimits,
    map_err: fn(E) -> UpstreamError,
) -> LineStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Send + 'static,
{
    let state = LineState {
        body: Box::pin(body),
        buffer: Some(LineBuffer::with_max_line_length(limits.max_line_length)),
        ready: VecDeque::new(),
        failure: None,
        cancel,
        read_timeout: limits.read_timeout,
    };

    let lines = stream::unfold(state, move |mut st| async move {
        loop {
            if let Some(line) = st.ready.pop_front() {
                return Some((Ok(line), st));
            }
            if let Some(e) = st.failure.take() {
                return Some((Err(e), st));
            }
            let buffer = st.buffer.as_mut()?;

            let next = tokio::select! {
                biased;
                _ = st.cancel.cancelled() => return None,
                chunk = tokio::time::timeout(st.read_timeout, st.body.next()) => chunk,
            };

            let Ok(next) = next else {
                tracing::warn!(
                    timeout_secs = st.read_timeout.as_secs_f64(),
                    "Upstream body went idle"
                );
                return st.fail(UpstreamError::Timeout);
            };

            match next {
                Some(Ok(chunk)) => {
                    if let Err(e) = buffer.push_into(chunk.as_ref(), &mut st.ready) {
                        st.buffer = None;
                        st.failure = Some(e);
                    }
                }
                Some(Err(e)) => return st.fail(map_err(e)),
                None => {
                    if let Some(rest) = st.buffer.take().and_then(LineBuffer::finish) {
                        st.ready.push_back(rest);
                    }
                }
            }
        }
    });

    Box::pin(lines)
}
