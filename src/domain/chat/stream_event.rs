//! Classification of raw upstream lines into typed stream events.
//!
//! The backend speaks a line protocol modelled on server-sent events: only
//! lines prefixed with `data: ` carry payload, `[DONE]` terminates the
//! stream, and a JSON envelope tagged `"type": "citation"` carries source
//! references. Everything else on a data line is generated text.

use serde::Deserialize;

/// Prefix that marks a payload-carrying line.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that terminates a successful stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One classified unit of upstream output.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Generated text, exactly as received after the prefix.
    Token { text: String },

    /// Structured citation payload. `raw` is the line payload as received
    /// so it can be forwarded to the client untouched.
    Citation {
        payload: serde_json::Value,
        raw: String,
    },

    /// Terminal sentinel.
    Done,

    /// Backend answered with a non-success status.
    UpstreamError { status: u16 },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::UpstreamError { .. })
    }
}

/// Structured payloads the backend may embed in a data line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StructuredPayload {
    Citation { citations: serde_json::Value },
}

/// Classifies a single upstream line.
///
/// Returns `None` for lines without the data prefix (comments, `event:`
/// fields, keep-alive blanks). Structured payloads that fail to decode
/// degrade to `Token` so a malformed envelope never aborts a turn.
pub fn classify_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    let trimmed = payload.trim();

    if trimmed == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }

    if trimmed.starts_with('{') {
        if let Ok(StructuredPayload::Citation { citations }) =
            serde_json::from_str::<StructuredPayload>(trimmed)
        {
            return Some(StreamEvent::Citation {
                payload: citations,
                raw: payload.to_string(),
            });
        }
    }

    Some(StreamEvent::Token {
        text: payload.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(text: &str) -> Option<StreamEvent> {
        Some(StreamEvent::Token {
            text: text.to_string(),
        })
    }

    mod prefix_handling {
        use super::*;

        #[test]
        fn lines_without_prefix_are_ignored() {
            assert_eq!(classify_line(""), None);
            assert_eq!(classify_line(": keep-alive"), None);
            assert_eq!(classify_line("event: message"), None);
            assert_eq!(classify_line("data:no-space"), None);
        }

        #[test]
        fn token_text_is_kept_verbatim() {
            assert_eq!(classify_line("data: Hello"), token("Hello"));
            assert_eq!(classify_line("data:  leading space "), token(" leading space "));
            assert_eq!(classify_line("data: "), token(""));
        }

        #[test]
        fn escaped_newlines_pass_through_untouched() {
            assert_eq!(classify_line("data: a\\nb"), token("a\\nb"));
        }
    }

    mod sentinel {
        use super::*;

        #[test]
        fn done_is_recognized() {
            assert_eq!(classify_line("data: [DONE]"), Some(StreamEvent::Done));
        }

        #[test]
        fn done_is_recognized_after_trimming() {
            assert_eq!(classify_line("data:  [DONE]  "), Some(StreamEvent::Done));
        }

        #[test]
        fn done_inside_text_is_a_token() {
            assert_eq!(classify_line("data: [DONE] early"), token("[DONE] early"));
        }
    }

    mod citations {
        use super::*;

        #[test]
        fn citation_envelope_is_decoded() {
            let line = r#"data: {"type": "citation", "citations": [{"id": 1, "title": "Doc"}]}"#;
            match classify_line(line) {
                Some(StreamEvent::Citation { payload, raw }) => {
                    assert_eq!(payload, json!([{"id": 1, "title": "Doc"}]));
                    assert_eq!(raw, &line[DATA_PREFIX.len()..]);
                }
                other => panic!("expected citation, got {:?}", other),
            }
        }

        #[test]
        fn citation_with_extra_fields_is_still_a_citation() {
            let line = r#"data: {"type":"citation","citations":{"a":1},"extra":true}"#;
            assert!(matches!(
                classify_line(line),
                Some(StreamEvent::Citation { .. })
            ));
        }

        #[test]
        fn citation_without_citations_field_degrades_to_token() {
            let line = r#"data: {"type": "citation"}"#;
            assert_eq!(classify_line(line), token(r#"{"type": "citation"}"#));
        }

        #[test]
        fn unknown_envelope_type_degrades_to_token() {
            let line = r#"data: {"type": "usage", "tokens": 12}"#;
            assert_eq!(classify_line(line), token(r#"{"type": "usage", "tokens": 12}"#));
        }

        #[test]
        fn truncated_json_degrades_to_token() {
            let line = r#"data: {"type": "citation", "citations": ["#;
            assert!(matches!(classify_line(line), Some(StreamEvent::Token { .. })));
        }
    }

    #[test]
    fn terminal_events() {
        assert!(StreamEvent::Done.is_terminal());
        assert!(StreamEvent::UpstreamError { status: 503 }.is_terminal());
        assert!(!StreamEvent::Token { text: String::new() }.is_terminal());
    }
}
