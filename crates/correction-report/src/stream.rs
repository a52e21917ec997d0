//! Incremental decoding of `data:` event streams.
//!
//! Streaming services send one JSON object per line:
//!
//! ```text
//! data: {"errors":[...]}
//! data: {"logId":"abc"}
//! data: [DONE]
//! ```
//!
//! Network chunks can split lines (and UTF-8 sequences) anywhere, so the decoder buffers bytes
//! until a full line is available. Lines that are not `data:` lines, and payloads that are not
//! valid JSON, are skipped.

use crate::report::{CheckResponse, log_id, parse_entries};
use correction_core::{OffsetEncoding, TextError};
use serde_json::Value;

/// One decoded stream item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Errors carried by a chunk (offsets still in wire encoding).
    Errors(Vec<TextError>),
    /// Service log identifier.
    LogId(String),
    /// The `[DONE]` terminator.
    Done,
}

/// Line-buffered `data:` stream decoder.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl StreamDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `[DONE]` was seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk of bytes, returning events for every completed line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            self.decode_line(&line, &mut events);
        }
        events
    }

    /// Flush a final line that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.decode_line(&line, &mut events);
        }
        events
    }

    fn decode_line(&mut self, raw: &[u8], events: &mut Vec<StreamEvent>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(payload) = line.strip_prefix("data:") else {
            return;
        };
        let payload = payload.trim_start();

        if payload == "[DONE]" {
            self.done = true;
            events.push(StreamEvent::Done);
            return;
        }

        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(%err, "skipping malformed stream chunk");
                return;
            }
        };

        if let Some(entries) = value.get("errors").and_then(Value::as_array) {
            events.push(StreamEvent::Errors(parse_entries(entries)));
        }
        if let Some(id) = log_id(&value) {
            events.push(StreamEvent::LogId(id));
        }
    }
}

/// Folds stream events into a [`CheckResponse`].
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    errors: Vec<TextError>,
    log_id: Option<String>,
    done: bool,
}

impl StreamAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event.
    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Errors(errors) => self.errors.extend(errors),
            StreamEvent::LogId(id) => self.log_id = Some(id),
            StreamEvent::Done => self.done = true,
        }
    }

    /// Whether `[DONE]` was received.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Finish with offsets converted for `submitted_text`.
    pub fn into_response(self, submitted_text: &str, encoding: OffsetEncoding) -> CheckResponse {
        CheckResponse::from_wire(self.errors, self.log_id, submitted_text, encoding)
    }
}

/// Returns `true` if `body` looks like an event stream rather than a JSON document.
pub fn is_event_stream(body: &str) -> bool {
    body.trim_start().starts_with("data:")
}

/// Decode a complete event-stream body.
pub fn parse_stream(body: &str, submitted_text: &str, encoding: OffsetEncoding) -> CheckResponse {
    let mut decoder = StreamDecoder::new();
    let mut acc = StreamAccumulator::new();
    for event in decoder.push(body.as_bytes()).into_iter().chain(decoder.finish()) {
        acc.apply(event);
    }
    acc.into_response(submitted_text, encoding)
}
