//! Line-oriented decoding of `text/event-stream` bodies.
//!
//! Each `data: ` line carries one complete JSON payload; the literal `[DONE]` payload
//! ends the stream. Lines are decoded independently of each other.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use serde_json::Value;

use crate::error::MistralError;
use crate::http::HttpBodyStream;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// Result of decoding a single raw line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineResult {
    /// Blank lines, comments and non-`data` fields.
    Ignore,
    /// The `[DONE]` terminator.
    Done,
    /// A decoded JSON payload.
    Payload(Value),
}

/// Decodes one raw SSE line.
///
/// # Examples
///
/// ```
/// use mistral_client::sse::{LineResult, decode_line};
/// use serde_json::json;
///
/// assert_eq!(decode_line(": keep-alive").unwrap(), LineResult::Ignore);
/// assert_eq!(decode_line("data: [DONE]").unwrap(), LineResult::Done);
/// assert_eq!(decode_line(r#"data: {"a":1}"#).unwrap(), LineResult::Payload(json!({"a": 1})));
/// ```
///
/// # Errors
///
/// Returns [`MistralError::Decode`] naming the offending line when the payload is not
/// valid JSON.
pub fn decode_line(line: &str) -> Result<LineResult, MistralError> {
    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(LineResult::Ignore);
    };
    let data = rest.trim();
    if data == DONE_MARKER {
        return Ok(LineResult::Done);
    }
    serde_json::from_str(data)
        .map(LineResult::Payload)
        .map_err(|err| MistralError::decode(format!("failed to decode stream line {line:?}: {err}")))
}

/// Lazily splits a chunked body into lines and yields decoded payloads.
///
/// Ignored lines are skipped, `[DONE]` ends the stream without reading further chunks,
/// and a trailing line without a newline is still decoded at end of body. Dropping the
/// stream drops the underlying body.
pub struct SseLineStream {
    body: HttpBodyStream,
    buffer: Vec<u8>,
    body_closed: bool,
    finished: bool,
}

impl SseLineStream {
    pub fn new(body: HttpBodyStream) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            body_closed: false,
            finished: false,
        }
    }

    fn drain_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
        buffer.iter().position(|b| *b == b'\n').map(|pos| {
            let mut line: Vec<u8> = buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            line
        })
    }

    /// Decodes one line; `None` means keep pulling.
    fn handle_line(&mut self, line: Vec<u8>) -> Option<Result<Value, MistralError>> {
        let line = match String::from_utf8(line) {
            Ok(line) => line,
            Err(err) => {
                self.finished = true;
                return Some(Err(MistralError::decode(format!(
                    "invalid UTF-8 in stream line: {err}"
                ))));
            }
        };
        match decode_line(&line) {
            Ok(LineResult::Ignore) => None,
            Ok(LineResult::Done) => {
                self.finished = true;
                None
            }
            Ok(LineResult::Payload(value)) => Some(Ok(value)),
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl Stream for SseLineStream {
    type Item = Result<Value, MistralError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            if let Some(line) = Self::drain_line(&mut this.buffer) {
                if let Some(item) = this.handle_line(line) {
                    return Poll::Ready(Some(item));
                }
                continue;
            }

            if this.body_closed {
                this.finished = true;
                if this.buffer.is_empty() {
                    return Poll::Ready(None);
                }
                let line = std::mem::take(&mut this.buffer);
                return Poll::Ready(this.handle_line(line));
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(err))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => this.body_closed = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::StreamExt;
    use futures_util::stream;
    use serde_json::json;

    use super::*;

    fn build_body(chunks: Vec<Result<Vec<u8>, MistralError>>) -> HttpBodyStream {
        Box::pin(stream::iter(chunks))
    }

    #[test]
    fn lines_without_data_prefix_are_ignored() {
        for line in ["", "\n", ": comment", "event: message", "id: 7", "data:{}", "DATA: {}"] {
            assert_eq!(decode_line(line).unwrap(), LineResult::Ignore, "line {line:?}");
        }
    }

    #[test]
    fn done_marker_tolerates_whitespace() {
        assert_eq!(decode_line("data: [DONE]").unwrap(), LineResult::Done);
        assert_eq!(decode_line("data:   [DONE]  \r\n").unwrap(), LineResult::Done);
    }

    #[test]
    fn invalid_json_names_the_line() {
        let err = decode_line("data: not-json").unwrap_err();
        match err {
            MistralError::Decode { message } => {
                assert!(message.contains("not-json"), "unexpected message: {message}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_splits_lines_across_chunks() {
        let chunks = vec![
            Ok(b"data: {\"a\"".to_vec()),
            Ok(b":1}\n\ndata: {\"a\":2}\r\n".to_vec()),
            Ok(b"\ndata: [DONE]\n\n".to_vec()),
        ];
        let items: Vec<_> = SseLineStream::new(build_body(chunks)).collect().await;
        let values: Vec<Value> = items.into_iter().map(|item| item.expect("ok")).collect();
        assert_eq!(values, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[tokio::test]
    async fn stream_stops_pulling_after_done() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let body: HttpBodyStream = Box::pin(
            stream::iter(vec![
                b"data: [DONE]\n".to_vec(),
                b"data: {\"late\":true}\n".to_vec(),
            ])
            .map(move |chunk| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, MistralError>(chunk)
            }),
        );
        let mut decoder = SseLineStream::new(body);
        assert!(decoder.next().await.is_none());
        assert!(decoder.next().await.is_none());
        assert_eq!(pulled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_decoded() {
        let chunks = vec![Ok(b"data: {\"tail\":true}".to_vec())];
        let mut decoder = SseLineStream::new(build_body(chunks));
        let value = decoder.next().await.expect("item").expect("ok");
        assert_eq!(value, json!({"tail": true}));
        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn decode_error_ends_the_stream() {
        let chunks = vec![Ok(b"data: nope\ndata: {\"a\":1}\n".to_vec())];
        let mut decoder = SseLineStream::new(build_body(chunks));
        let err = decoder.next().await.expect("item").unwrap_err();
        assert!(matches!(err, MistralError::Decode { .. }));
        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn invalid_utf8_is_reported() {
        let chunks = vec![Ok(b"data: \xff\n".to_vec())];
        let mut decoder = SseLineStream::new(build_body(chunks));
        let err = decoder.next().await.expect("item").unwrap_err();
        assert!(matches!(err, MistralError::Decode { .. }));
    }

    #[tokio::test]
    async fn transport_errors_are_forwarded() {
        let chunks = vec![
            Ok(b"data: {\"a\":1}\n".to_vec()),
            Err(MistralError::unexpected("connection reset")),
        ];
        let mut decoder = SseLineStream::new(build_body(chunks));
        assert_eq!(decoder.next().await.expect("item").expect("ok"), json!({"a": 1}));
        let err = decoder.next().await.expect("item").unwrap_err();
        assert!(matches!(err, MistralError::Unexpected { .. }));
        assert!(decoder.next().await.is_none());
    }
}
