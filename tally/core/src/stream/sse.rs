//! Event Stream Decoder
//!
//! Incremental parser for `text/event-stream` bodies.
//!
//! # Wire Format
//!
//! ```text
//! event: time
//! data: Timer: 1 seconds
//!
//! : keep-alive comment
//!
//! event: exit
//! data: exited
//!
//! ```
//!
//! Lines end in `\n`, `\r\n` or `\r`. A blank line dispatches the fields
//! collected so far, but only if at least one `data` line was seen. Bytes may
//! arrive in arbitrary chunks; lines are only decoded once complete, so a
//! UTF-8 sequence split across chunks is reassembled before decoding.

use super::event::{StreamEvent, StreamEventKind};

/// Minimum buffer capacity for decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// One dispatched event-stream frame
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name (`None` means the default `message` event)
    pub event: Option<String>,
    /// Data lines joined with `\n`
    pub data: String,
    /// Last event ID seen on the stream
    pub id: Option<String>,
}

impl SseFrame {
    /// Event name, defaulting to `message`
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }

    /// Convert to a timer stream event
    ///
    /// Frames with an event name other than `time` or `exit` yield `None`.
    #[must_use]
    pub fn into_stream_event(self) -> Option<StreamEvent> {
        let kind = StreamEventKind::from_event_name(self.event_name())?;
        Some(StreamEvent {
            kind,
            payload: self.data,
        })
    }
}

/// Decoder state machine for streaming event parsing
///
/// Buffers incoming bytes and yields complete frames.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Position where we've consumed up to
    read_pos: usize,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    /// Create a new decoder
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            read_pos: 0,
            event: None,
            data: Vec::new(),
            last_id: None,
        }
    }

    /// Append bytes to the buffer
    pub fn push(&mut self, data: &[u8]) {
        if self.read_pos > self.buffer.len() / 2 && self.read_pos > MIN_BUFFER_CAPACITY {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Bytes buffered but not yet consumed
    #[must_use]
    pub fn available(&self) -> usize {
        self.buffer.len() - self.read_pos
    }

    /// Try to decode the next frame
    ///
    /// Returns `None` when more data is needed.
    pub fn decode(&mut self) -> Option<SseFrame> {
        while let Some(line) = self.next_line() {
            if line.is_empty() {
                if let Some(frame) = self.dispatch() {
                    return Some(frame);
                }
                continue;
            }
            self.process_line(&line);
        }
        None
    }

    /// Clear all buffered bytes and partial fields
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.read_pos = 0;
        self.event = None;
        self.data.clear();
    }

    fn next_line(&mut self) -> Option<String> {
        let pending = &self.buffer[self.read_pos..];
        let pos = pending.iter().position(|b| *b == b'\n' || *b == b'\r')?;

        let terminator_len = if pending[pos] == b'\r' {
            match pending.get(pos + 1) {
                Some(b'\n') => 2,
                Some(_) => 1,
                // Could be the first half of a \r\n pair
                None => return None,
            }
        } else {
            1
        };

        let line = String::from_utf8_lossy(&pending[..pos]).into_owned();
        self.read_pos += pos + terminator_len;
        Some(line)
    }

    fn process_line(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.find(':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                (&line[..idx], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            // retry and unknown fields are ignored
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }

        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event,
            data,
            id: self.last_id.clone(),
        })
    }
}
