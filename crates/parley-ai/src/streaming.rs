//! Server-Sent Events (SSE) streaming parser.
//!
//! OpenAI-compatible chat endpoints stream `data: {json}` events terminated
//! by `data: [DONE]`. [`sse_events`] turns any line-oriented byte source into
//! events, and [`delta_stream`] maps chat-completion chunks to text deltas.

use futures_util::{future, Stream, StreamExt, TryStreamExt};
use parley_common::GenerationError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::DeltaStream;

/// A single SSE event parsed from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// The `event:` field, if the server sent one.
    pub event: Option<String>,
    /// Joined `data:` lines.
    pub data: String,
}

/// Line-at-a-time SSE accumulator.
#[derive(Debug, Default)]
struct SseDecoder {
    event: Option<String>,
    data: String,
    has_data: bool,
}

impl SseDecoder {
    fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            return self.take();
        }
        if let Some(event_type) = field(line, "event") {
            self.event = Some(event_type.to_string());
        } else if let Some(data) = field(line, "data") {
            if self.has_data {
                self.data.push('\n');
            }
            self.data.push_str(data);
            self.has_data = true;
        }
        // id:, retry: and `:` comments are ignored
        None
    }

    fn take(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if !std::mem::take(&mut self.has_data) {
            return None;
        }
        Some(SseEvent {
            event,
            data: std::mem::take(&mut self.data),
        })
    }
}

fn field<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Parse SSE events from a buffered reader. A trailing event without a
/// blank line after it is still delivered.
pub fn sse_events<R>(reader: R) -> impl Stream<Item = Result<SseEvent, GenerationError>> + Send
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let state = Some((reader.lines(), SseDecoder::default()));
    futures_util::stream::unfold(state, |state| async move {
        let (mut lines, mut decoder) = state?;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(event) = decoder.push_line(&line) {
                        return Some((Ok(event), Some((lines, decoder))));
                    }
                }
                Ok(None) => return decoder.take().map(|event| (Ok(event), None)),
                Err(e) => return Some((Err(GenerationError::Network(e.to_string())), None)),
            }
        }
    })
}

enum Chunk {
    Text(String),
    Done,
}

/// Interpret one `data:` payload of a chat-completion stream.
fn parse_chunk(data: &str) -> Result<Chunk, GenerationError> {
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(Chunk::Done);
    }
    let json: serde_json::Value =
        serde_json::from_str(data).map_err(|e| GenerationError::Parse(e.to_string()))?;

    if let Some(err) = json.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| err.to_string());
        return Err(GenerationError::Api(message));
    }

    let text = json["choices"][0]["delta"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    Ok(Chunk::Text(text))
}

/// Text deltas of a streamed chat completion. Ends at `[DONE]` or end of
/// input; empty deltas are dropped.
pub fn delta_stream<R>(reader: R) -> DeltaStream
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let deltas = sse_events(reader)
        .map(|event| event.and_then(|e| parse_chunk(&e.data)))
        .try_take_while(|chunk| future::ready(Ok(!matches!(chunk, Chunk::Done))))
        .try_filter_map(|chunk| {
            future::ready(Ok(match chunk {
                Chunk::Text(text) if !text.is_empty() => Some(text),
                _ => None,
            }))
        })
        .inspect_err(|e| debug!("stream ended with error: {e}"));
    Box::pin(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    fn reader(body: &'static str) -> &'static [u8] {
        body.as_bytes()
    }

    async fn collect_deltas(body: &'static str) -> Result<Vec<String>, GenerationError> {
        delta_stream(reader(body)).try_collect().await
    }

    #[tokio::test]
    async fn parses_events_with_and_without_space() {
        let body = "event: message\ndata: one\n\ndata:two\ndata: three\n\n: keep-alive\n\n";
        let events: Vec<SseEvent> = sse_events(reader(body)).try_collect().await.unwrap();
        assert_eq!(
            events,
            vec![
                SseEvent {
                    event: Some("message".into()),
                    data: "one".into()
                },
                SseEvent {
                    event: None,
                    data: "two\nthree".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn flushes_trailing_event() {
        let events: Vec<SseEvent> = sse_events(reader("data: last"))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "last");
    }

    #[tokio::test]
    async fn handles_crlf_lines() {
        let events: Vec<SseEvent> = sse_events(reader("data: a\r\n\r\ndata: b\r\n\r\n"))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(events[0].data, "a");
        assert_eq!(events[1].data, "b");
    }

    #[tokio::test]
    async fn extracts_deltas_until_done() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        );
        assert_eq!(collect_deltas(body).await.unwrap(), vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn error_payload_becomes_api_error() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
            "data: {\"error\":{\"message\":\"Input validation error\"}}\n\n",
        );
        let err = collect_deltas(body).await.unwrap_err();
        assert_eq!(err, GenerationError::Api("Input validation error".into()));
    }

    #[tokio::test]
    async fn malformed_json_is_parse_error() {
        let err = collect_deltas("data: {oops\n\n").await.unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }
}
