//! Stream Events
//!
//! The two kinds of value carried by a timer stream. On the wire a tick is
//! sent under the event name `time` and the terminal event under `exit`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Payload carried by the terminal event
pub const EXIT_PAYLOAD: &str = "exited";

/// Kind of stream event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamEventKind {
    /// One timer firing
    Tick,
    /// Terminal event, sent once after the last tick
    Exit,
}

impl StreamEventKind {
    /// Event name used on the wire
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Tick => "time",
            Self::Exit => "exit",
        }
    }

    /// Parse a wire event name. Unknown names yield `None`.
    #[must_use]
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "time" => Some(Self::Tick),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for StreamEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// A single event on a timer stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// What kind of event this is
    pub kind: StreamEventKind,
    /// Text payload
    pub payload: String,
}

impl StreamEvent {
    /// Tick event for the given counter value
    #[must_use]
    pub fn tick(tick_count: u32) -> Self {
        Self {
            kind: StreamEventKind::Tick,
            payload: format!("Timer: {tick_count} seconds"),
        }
    }

    /// The terminal event
    #[must_use]
    pub fn exit() -> Self {
        Self {
            kind: StreamEventKind::Exit,
            payload: EXIT_PAYLOAD.to_string(),
        }
    }

    /// Whether this is the terminal event
    #[must_use]
    pub fn is_exit(&self) -> bool {
        self.kind == StreamEventKind::Exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_payload() {
        let event = StreamEvent::tick(7);
        assert_eq!(event.kind, StreamEventKind::Tick);
        assert_eq!(event.payload, "Timer: 7 seconds");
        assert!(!event.is_exit());
    }

    #[test]
    fn test_exit_payload() {
        let event = StreamEvent::exit();
        assert!(event.is_exit());
        assert_eq!(event.payload, "exited");
    }

    #[test]
    fn test_event_names() {
        assert_eq!(StreamEventKind::Tick.event_name(), "time");
        assert_eq!(StreamEventKind::Exit.to_string(), "exit");
        assert_eq!(
            StreamEventKind::from_event_name("time"),
            Some(StreamEventKind::Tick)
        );
        assert_eq!(
            StreamEventKind::from_event_name("exit"),
            Some(StreamEventKind::Exit)
        );
        assert_eq!(StreamEventKind::from_event_name("message"), None);
        assert_eq!(StreamEventKind::from_event_name("tick"), None);
    }
}
