// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Incremental decoder for chat-completion event streams
//!
//! The endpoint answers with a chunked body of server-sent events:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"- add "}}]}
//!
//! data: {"choices":[{"delta":{"content":"hello line"}}]}
//!
//! data: [DONE]
//! ```
//!
//! Chunks from the transport carry no framing guarantee, so bytes that do not
//! yet form a complete event are carried over to the next chunk. Framing is a
//! pure function ([`split_events`]); [`SseDecoder`] adds payload parsing and
//! end-of-stream tracking on top of it.

use serde::Deserialize;

/// Terminates one event record.
pub const EVENT_SEPARATOR: &[u8] = b"\n\n";

/// Prefix of event lines that carry a payload.
pub const DATA_PREFIX: &str = "data:";

/// Payload value marking the end of generation.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Append `input` to `buffer` and cut off every complete event.
///
/// Returns the unterminated remainder (the next buffer) and the complete
/// events in arrival order. Bytes after the last separator are never dropped.
pub fn split_events(mut buffer: Vec<u8>, input: &[u8]) -> (Vec<u8>, Vec<String>) {
    buffer.extend_from_slice(input);

    let mut events = Vec::new();
    let mut start = 0;
    while let Some(offset) = find_separator(&buffer[start..]) {
        let end = start + offset;
        events.push(String::from_utf8_lossy(&buffer[start..end]).into_owned());
        start = end + EVENT_SEPARATOR.len();
    }

    let rest = buffer.split_off(start);
    (rest, events)
}

fn find_separator(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(EVENT_SEPARATOR.len())
        .position(|window| window == EVENT_SEPARATOR)
}

/// What one complete event turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Incremental text to append
    Delta(String),
    /// Well-formed event without text (role-only, stop, keep-alive, comment)
    Empty,
    /// End-of-stream sentinel
    Done,
    /// Payload that failed to parse
    Malformed(String),
}

/// Classify one complete event record.
pub fn parse_event(event: &str) -> EventKind {
    if event.contains(DONE_SENTINEL) {
        return EventKind::Done;
    }

    let Some(payload) = event.trim_start().strip_prefix(DATA_PREFIX) else {
        return EventKind::Empty;
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => {
            if let Some(error) = chunk.error {
                tracing::warn!(
                    target: "quill.decoder",
                    message = %error.message,
                    "endpoint reported an error inside the stream"
                );
            }
            chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta)
                .and_then(|delta| delta.content)
                .filter(|text| !text.is_empty())
                .map(EventKind::Delta)
                .unwrap_or(EventKind::Empty)
        }
        Err(e) => EventKind::Malformed(e.to_string()),
    }
}

/// Output of feeding one chunk into the decoder.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecodeStep {
    /// Text fragments, in stream order
    pub fragments: Vec<String>,
    /// The sentinel has been seen
    pub finished: bool,
}

/// Stateful reassembler from byte chunks to text fragments.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    finished: bool,
    malformed: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything; used when a new attempt starts.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.finished = false;
        self.malformed = 0;
    }

    /// Feed one transport chunk.
    ///
    /// Once the sentinel has been seen, further input is ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> DecodeStep {
        let mut step = DecodeStep {
            fragments: Vec::new(),
            finished: self.finished,
        };
        if self.finished {
            return step;
        }

        let (rest, events) = split_events(std::mem::take(&mut self.buffer), chunk);
        self.buffer = rest;

        for event in events {
            match parse_event(&event) {
                EventKind::Delta(text) => step.fragments.push(text),
                EventKind::Empty => {}
                EventKind::Done => {
                    tracing::debug!(target: "quill.decoder", "end-of-stream sentinel received");
                    self.finished = true;
                    self.buffer.clear();
                    step.finished = true;
                    break;
                }
                EventKind::Malformed(reason) => {
                    self.malformed += 1;
                    tracing::warn!(
                        target: "quill.decoder",
                        %reason,
                        event = %event,
                        "skipping malformed stream event"
                    );
                }
            }
        }

        step
    }

    /// Whether the sentinel has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of events skipped because they failed to parse.
    pub fn malformed_events(&self) -> usize {
        self.malformed
    }

    /// Bytes received but not yet resolved into a complete event.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

// Streaming payload types (OpenAI-compatible format)

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    #[serde(default)]
    message: String,
}
