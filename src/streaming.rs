//! Streaming support: SSE decoding and delta aggregation.
//!
//! The proxy relays model output as Server-Sent Events. Each event carries a
//! JSON chunk in the OpenAI delta shape; the stream ends with a `[DONE]`
//! sentinel. [`parse_event_stream`] turns the raw HTTP body into parsed
//! [`ChatChunk`]s, and [`DeltaAggregator`] assembles the interleaved text
//! and tool-call fragments into a complete assistant [`Message`] once a
//! `finish_reason` arrives.

use crate::types::{ChatChunk, Message, MessageRole, PromptContent, ToolCall};
use crate::{Error, Result};
use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use std::collections::BTreeMap;
use std::pin::Pin;

/// A pinned, boxed stream of parsed chunks from the proxy.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// Decode an HTTP response body as an SSE stream of [`ChatChunk`]s.
///
/// Comment/heartbeat events and the `[DONE]` sentinel are skipped; transport
/// and JSON errors are surfaced per-item without terminating the stream.
pub fn parse_event_stream(response: reqwest::Response) -> ChunkStream {
    let stream = response
        .bytes_stream()
        .eventsource()
        .filter_map(|event| async move {
            match event {
                Ok(event) => {
                    if event.data == "[DONE]" || event.data.is_empty() {
                        return None;
                    }
                    match serde_json::from_str::<ChatChunk>(&event.data) {
                        Ok(chunk) => Some(Ok(chunk)),
                        Err(e) => Some(Err(Error::stream(format!(
                            "Failed to parse chunk: {e}"
                        )))),
                    }
                }
                Err(e) => Some(Err(Error::stream(format!("Event stream error: {e}")))),
            }
        });

    Box::pin(stream)
}

/// Assembles streamed deltas into a complete assistant message.
///
/// Text deltas are concatenated; tool-call fragments are keyed by their
/// API-provided index so interleaved calls accumulate independently, with
/// argument JSON allowed to split at arbitrary byte positions. A message is
/// emitted only when a chunk carries a `finish_reason`, after which the
/// aggregator is ready for the next turn.
#[derive(Default)]
pub struct DeltaAggregator {
    text_buffer: String,
    tool_calls: BTreeMap<u32, PartialToolCall>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl DeltaAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk into the aggregate.
    ///
    /// Returns `Ok(None)` while generation is ongoing and
    /// `Ok(Some(message))` when a `finish_reason` completes the turn.
    /// Tool calls whose accumulated argument text is not valid JSON are a
    /// stream error; fragments missing an id or name are dropped.
    pub fn process_chunk(&mut self, chunk: ChatChunk) -> Result<Option<Message>> {
        let mut finished = false;

        for choice in chunk.choices {
            if let Some(content) = choice.delta.content {
                self.text_buffer.push_str(&content);
            }

            if let Some(deltas) = choice.delta.tool_calls {
                for delta in deltas {
                    let entry = self.tool_calls.entry(delta.index).or_default();
                    if let Some(id) = delta.id {
                        entry.id = Some(id);
                    }
                    if let Some(function) = delta.function {
                        if let Some(name) = function.name {
                            entry.name = Some(name);
                        }
                        if let Some(arguments) = function.arguments {
                            entry.arguments.push_str(&arguments);
                        }
                    }
                }
            }

            if choice.finish_reason.is_some() {
                finished = true;
            }
        }

        if !finished {
            return Ok(None);
        }

        let mut calls = Vec::new();
        for (_, partial) in std::mem::take(&mut self.tool_calls) {
            if let (Some(id), Some(name)) = (partial.id, partial.name) {
                let arguments: serde_json::Value = if partial.arguments.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(&partial.arguments).map_err(|e| {
                        Error::stream(format!("Failed to parse tool arguments: {e}"))
                    })?
                };
                calls.push(ToolCall::new(id, name, arguments));
            }
        }

        let mut message = Message::new(
            MessageRole::Assistant,
            PromptContent::Text(std::mem::take(&mut self.text_buffer)),
        );
        if !calls.is_empty() {
            message.tool_calls = Some(calls);
        }
        Ok(Some(message))
    }
}
