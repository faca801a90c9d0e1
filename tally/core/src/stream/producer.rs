//! Timer Stream Producer
//!
//! Runs one periodic timer per open stream and pushes its events into a
//! bounded channel that the transport drains.
//!
//! # Lifecycle
//!
//! ```text
//!  open(token) ──► spawn SessionTask ──► interval.tick() ──► tick event
//!                        │                                       │
//!                        │                    limit reached ─────┴──► exit event
//!                        │                                               │
//!                        ├── token cancelled ─────────┐                  │
//!                        ├── receiver dropped ────────┼──► release() ◄───┘
//!                        └── task aborted (Drop) ─────┘
//! ```
//!
//! Every ending goes through `SessionRelease::release`, which is guarded by a
//! finished flag and runs its side effects at most once. The interval is
//! owned by the task, so the timer stops when the task returns.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use dashmap::DashMap;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, Instrument};

use super::event::StreamEvent;
use super::session::{SessionId, SessionState, StreamSession};
use crate::source::Subscription;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for timer streams
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    /// Ticks emitted before the exit event
    pub tick_limit: u32,
    /// Time between ticks
    pub tick_period: Duration,
    /// Events buffered per session before the producer waits on the reader
    pub channel_capacity: usize,
    /// Interval between keep-alive comments on HTTP streams
    pub keep_alive: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tick_limit: 10,
            tick_period: Duration::from_secs(1),
            channel_capacity: 16,
            keep_alive: Duration::from_secs(15),
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Default)]
struct ProducerStats {
    sessions_opened: AtomicU64,
    active_sessions: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
    ticks_emitted: AtomicU64,
}

/// Point-in-time copy of the producer's lifetime statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerSnapshot {
    /// Sessions opened since the producer was created
    pub sessions_opened: u64,
    /// Sessions currently running
    pub active_sessions: u64,
    /// Sessions that reached their tick limit
    pub completed: u64,
    /// Sessions that ended early
    pub cancelled: u64,
    /// Tick events successfully handed to readers
    pub ticks_emitted: u64,
}

/// Why a session ended before its limit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CancelReason {
    /// Cancellation token fired (client disconnect or shutdown)
    Signal,
    /// The reader went away mid-write
    WriteFailed,
    /// The task was dropped without finishing
    Aborted,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Signal => "cancellation signal",
            Self::WriteFailed => "write to closed stream",
            Self::Aborted => "task aborted",
        })
    }
}

enum Ending {
    Completed,
    Cancelled(CancelReason),
}

// ============================================================================
// Session Task
// ============================================================================

/// Exactly-once cleanup for a session
struct SessionRelease {
    id: SessionId,
    finished: AtomicBool,
    state: watch::Sender<SessionState>,
    sessions: Arc<DashMap<SessionId, CancellationToken>>,
    stats: Arc<ProducerStats>,
}

impl SessionRelease {
    fn publish(&self, state: SessionState) {
        self.state.send_replace(state);
    }

    /// Returns `false` if the session was already released
    fn release(&self, state: SessionState, reason: &dyn fmt::Display) -> bool {
        if self.finished.swap(true, Ordering::SeqCst) {
            return false;
        }

        self.sessions.remove(&self.id);
        self.stats.active_sessions.fetch_sub(1, Ordering::SeqCst);
        match state {
            SessionState::Completed => self.stats.completed.fetch_add(1, Ordering::SeqCst),
            _ => self.stats.cancelled.fetch_add(1, Ordering::SeqCst),
        };
        self.publish(state);

        info!(session = %self.id, state = %state, reason = %reason, "Stream session released");
        true
    }
}

struct SessionTask {
    session: StreamSession,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
    period: Duration,
    stats: Arc<ProducerStats>,
    release: SessionRelease,
}

impl SessionTask {
    async fn run(mut self) {
        let cancel = self.cancel.clone();
        if cancel.is_cancelled() {
            self.session.cancel();
            self.release
                .release(SessionState::Cancelled, &CancelReason::Signal);
            return;
        }

        self.session.start();
        self.release.publish(SessionState::Running);
        debug!(limit = self.session.limit(), "Session started");

        let mut interval = time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let ending = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break Ending::Cancelled(CancelReason::Signal),
                _ = interval.tick() => {
                    if let Some(ending) = self.on_tick().await {
                        break ending;
                    }
                }
            }
        };

        match ending {
            Ending::Completed => {
                self.release
                    .release(SessionState::Completed, &"tick limit reached");
            }
            Ending::Cancelled(reason) => {
                self.session.cancel();
                self.release.release(SessionState::Cancelled, &reason);
            }
        }
    }

    async fn on_tick(&mut self) -> Option<Ending> {
        let Some(event) = self.session.tick() else {
            // Not running or already at the limit
            return Some(Ending::Completed);
        };
        let tick_count = self.session.tick_count();
        debug!(tick_count, "Tick");

        if let Err(reason) = self.send(event).await {
            return Some(Ending::Cancelled(reason));
        }
        self.stats.ticks_emitted.fetch_add(1, Ordering::SeqCst);

        let exit = self.session.complete()?;
        info!(tick_count, "Tick limit reached");
        if let Err(reason) = self.send(exit).await {
            debug!(%reason, "Exit event not delivered");
            return Some(Ending::Cancelled(reason));
        }
        Some(Ending::Completed)
    }

    async fn send(&self, event: StreamEvent) -> Result<(), CancelReason> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(CancelReason::Signal),
            result = self.tx.send(event) => result.map_err(|_| CancelReason::WriteFailed),
        }
    }
}

impl Drop for SessionTask {
    fn drop(&mut self) {
        if !self.release.finished.load(Ordering::SeqCst) {
            self.session.cancel();
            self.release
                .release(SessionState::Cancelled, &CancelReason::Aborted);
        }
    }
}

// ============================================================================
// Timer Stream
// ============================================================================

/// Reader side of one session
///
/// Yields tick events and then the exit event; ends when the session ends.
/// Dropping it cancels the session.
#[derive(Debug)]
pub struct TimerStream {
    id: SessionId,
    rx: mpsc::Receiver<StreamEvent>,
    state: watch::Receiver<SessionState>,
    guard: DropGuard,
}

impl TimerStream {
    /// ID of the session behind this stream
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.id
    }

    /// Receive the next event, `None` once the session has ended
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Current session state
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch the session state; stays readable after the stream is dropped
    #[must_use]
    pub fn state_watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Convert into a consumer subscription, keeping the cancel-on-drop guard
    #[must_use]
    pub fn into_subscription(self) -> Subscription {
        Subscription::with_guard(self.rx, self.guard)
    }
}

impl Stream for TimerStream {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

// ============================================================================
// Producer
// ============================================================================

/// Opens timer stream sessions
///
/// Cheap to clone; clones share the live-session registry and statistics.
#[derive(Clone)]
pub struct TimerStreamProducer {
    config: StreamConfig,
    sessions: Arc<DashMap<SessionId, CancellationToken>>,
    stats: Arc<ProducerStats>,
}

impl Default for TimerStreamProducer {
    fn default() -> Self {
        Self::new(StreamConfig::default())
    }
}

impl TimerStreamProducer {
    /// Create a producer with the given configuration
    #[must_use]
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(DashMap::new()),
            stats: Arc::new(ProducerStats::default()),
        }
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Open a new session
    ///
    /// `cancel` is the transport's disconnect signal. The returned stream
    /// also cancels it when dropped. Must be called inside a tokio runtime.
    pub fn open(&self, cancel: CancellationToken) -> TimerStream {
        let session = StreamSession::new(self.config.tick_limit);
        let id = session.id().clone();
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);

        self.sessions.insert(id.clone(), cancel.clone());
        self.stats.sessions_opened.fetch_add(1, Ordering::SeqCst);
        self.stats.active_sessions.fetch_add(1, Ordering::SeqCst);

        info!(
            session = %id,
            limit = session.limit(),
            period_ms = self.config.tick_period.as_millis() as u64,
            "Stream session opened"
        );

        let task = SessionTask {
            session,
            tx,
            cancel: cancel.clone(),
            period: self.config.tick_period.max(Duration::from_millis(1)),
            stats: Arc::clone(&self.stats),
            release: SessionRelease {
                id: id.clone(),
                finished: AtomicBool::new(false),
                state: state_tx,
                sessions: Arc::clone(&self.sessions),
                stats: Arc::clone(&self.stats),
            },
        };
        tokio::spawn(
            task.run()
                .instrument(tracing::info_span!("stream_session", session = %id)),
        );

        TimerStream {
            id,
            rx,
            state: state_rx,
            guard: cancel.drop_guard(),
        }
    }

    /// Cancel every live session, returning how many were signalled
    pub fn shutdown(&self) -> usize {
        let tokens: Vec<CancellationToken> =
            self.sessions.iter().map(|entry| entry.value().clone()).collect();
        for token in &tokens {
            token.cancel();
        }
        if !tokens.is_empty() {
            info!(count = tokens.len(), "Cancelled live stream sessions");
        }
        tokens.len()
    }

    /// Number of sessions currently running
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether a session is still registered
    #[must_use]
    pub fn is_active(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Snapshot of lifetime statistics
    #[must_use]
    pub fn stats(&self) -> ProducerSnapshot {
        ProducerSnapshot {
            sessions_opened: self.stats.sessions_opened.load(Ordering::SeqCst),
            active_sessions: self.stats.active_sessions.load(Ordering::SeqCst),
            completed: self.stats.completed.load(Ordering::SeqCst),
            cancelled: self.stats.cancelled.load(Ordering::SeqCst),
            ticks_emitted: self.stats.ticks_emitted.load(Ordering::SeqCst),
        }
    }
}

impl fmt::Debug for TimerStreamProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerStreamProducer")
            .field("config", &self.config)
            .field("active_sessions", &self.sessions.len())
            .finish()
    }
}
