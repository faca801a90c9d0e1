//! Stream Session
//!
//! Server-side state for one open timer stream: the tick counter, its limit
//! and the lifecycle state. A session is owned by exactly one producer task
//! and never shared.
//!
//! # State Machine
//!
//! ```text
//!   Idle ──start()──► Running ──complete()──► Completed
//!     │                  │
//!     └────cancel()──────┴──────────────────► Cancelled
//! ```
//!
//! Only `Running` emits ticks. `complete()` hands out the exit event exactly
//! once; afterwards every transition is refused.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::event::StreamEvent;

/// Unique identifier for a stream session
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session ID
    #[must_use]
    pub fn new() -> Self {
        Self(format!("stream-{}", uuid::Uuid::new_v4()))
    }

    /// Get the string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, timer not started yet
    Idle,
    /// Timer running, ticks are being emitted
    Running,
    /// Tick limit reached and exit event handed out
    Completed,
    /// Stopped early by the client or the transport
    Cancelled,
}

impl SessionState {
    /// Whether the session has ended
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Human-readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single timer stream session
#[derive(Debug)]
pub struct StreamSession {
    id: SessionId,
    tick_count: u32,
    limit: u32,
    cancelled: bool,
    state: SessionState,
}

impl StreamSession {
    /// Create an idle session that completes after `limit` ticks
    ///
    /// A limit of zero is raised to one so that every session emits at least
    /// one tick before its exit.
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            id: SessionId::new(),
            tick_count: 0,
            limit: limit.max(1),
            cancelled: false,
            state: SessionState::Idle,
        }
    }

    /// Session ID
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Ticks emitted so far
    #[must_use]
    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    /// Tick limit
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Whether the session was cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the tick limit has been reached
    #[must_use]
    pub fn limit_reached(&self) -> bool {
        self.tick_count >= self.limit
    }

    /// Move from `Idle` to `Running`. Returns `false` in any other state.
    pub fn start(&mut self) -> bool {
        if self.state != SessionState::Idle {
            return false;
        }
        self.state = SessionState::Running;
        true
    }

    /// Advance the counter and produce the tick event
    ///
    /// Returns `None` unless the session is running and below its limit.
    pub fn tick(&mut self) -> Option<StreamEvent> {
        if self.state != SessionState::Running || self.limit_reached() {
            return None;
        }
        self.tick_count += 1;
        Some(StreamEvent::tick(self.tick_count))
    }

    /// Finish the session once the limit is reached
    ///
    /// Returns the exit event on the first successful call and `None`
    /// thereafter, or if the limit has not been reached yet.
    pub fn complete(&mut self) -> Option<StreamEvent> {
        if self.state != SessionState::Running || !self.limit_reached() {
            return None;
        }
        self.state = SessionState::Completed;
        Some(StreamEvent::exit())
    }

    /// Cancel the session. Returns `false` if it had already ended.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.cancelled = true;
        self.state = SessionState::Cancelled;
        true
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::stream::event::StreamEventKind;

    /// Drive a session to completion, collecting everything it emits
    fn run_to_end(session: &mut StreamSession) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(tick) = session.tick() {
            events.push(tick);
            if let Some(exit) = session.complete() {
                events.push(exit);
            }
        }
        events
    }

    #[test]
    fn test_session_id_format() {
        let id = SessionId::new();
        assert!(id.as_str().starts_with("stream-"));
        // stream- (7 chars) + UUID (36 chars)
        assert_eq!(id.to_string().len(), 43);
        assert_ne!(id, SessionId::new());
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = StreamSession::new(10);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.tick_count(), 0);
        assert_eq!(session.limit(), 10);
        assert!(!session.is_cancelled());
    }

    #[test]
    fn test_idle_session_does_not_tick() {
        let mut session = StreamSession::new(3);
        assert!(session.tick().is_none());
        assert_eq!(session.tick_count(), 0);
    }

    #[test]
    fn test_full_sequence() {
        let mut session = StreamSession::new(10);
        assert!(session.start());

        let events = run_to_end(&mut session);

        let mut expected: Vec<StreamEvent> = (1..=10).map(StreamEvent::tick).collect();
        expected.push(StreamEvent::exit());
        assert_eq!(events, expected);
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.tick_count(), 10);
    }

    #[test]
    fn test_exactly_one_exit() {
        let mut session = StreamSession::new(2);
        session.start();
        session.tick();
        assert!(session.complete().is_none(), "limit not reached yet");
        session.tick();

        assert!(session.complete().is_some());
        assert!(session.complete().is_none());
        assert!(session.tick().is_none(), "no tick after exit");
        assert_eq!(session.tick_count(), 2);
    }

    #[test]
    fn test_zero_limit_is_raised() {
        let mut session = StreamSession::new(0);
        session.start();
        let events = run_to_end(&mut session);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, StreamEventKind::Exit);
    }

    #[test]
    fn test_cancel_stops_ticks() {
        let mut session = StreamSession::new(10);
        session.start();
        session.tick();
        session.tick();

        assert!(session.cancel());
        assert!(session.is_cancelled());
        assert_eq!(session.state(), SessionState::Cancelled);
        assert!(session.tick().is_none());
        assert!(session.complete().is_none());
        assert_eq!(session.tick_count(), 2);

        // Second cancel is a no-op
        assert!(!session.cancel());
    }

    #[test]
    fn test_cancel_from_idle() {
        let mut session = StreamSession::new(10);
        assert!(session.cancel());
        assert!(!session.start());
    }

    #[test]
    fn test_completed_session_cannot_be_cancelled() {
        let mut session = StreamSession::new(1);
        session.start();
        session.tick();
        session.complete();

        assert!(!session.cancel());
        assert!(!session.is_cancelled());
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn test_state_labels() {
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Running.is_terminal());
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert_eq!(SessionState::Cancelled.to_string(), "cancelled");
    }
}
