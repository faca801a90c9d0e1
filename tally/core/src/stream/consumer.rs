//! Timer Stream Consumer
//!
//! Client side of a timer stream. Opens a connection through an
//! [`EventSource`], appends each tick payload to an append-only log, and
//! releases the connection on `exit` or when asked to stop.
//!
//! # Architecture
//!
//! ```text
//!   start() ──► source.open() ──► spawn pump ──► recv() ─┬─ tick ──► log.push
//!                                   │                    ├─ exit ──► release
//!                                   │                    └─ None ──► release
//!   stop()  ──► abort pump ─────────┘ (drops Subscription, closing the connection)
//! ```
//!
//! Each connection carries a generation number. A pump only writes to the log
//! and only releases the slot while its generation is current, so a late
//! event from an old connection cannot land after `stop()` returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, Instrument};

use crate::source::{EventSource, StreamError, Subscription};

use super::event::StreamEventKind;

#[derive(Debug)]
struct Connection {
    generation: u64,
    abort: AbortHandle,
}

struct ConsumerInner {
    log: Mutex<Vec<String>>,
    streaming: watch::Sender<bool>,
    log_len: watch::Sender<usize>,
    connection: Mutex<Option<Connection>>,
    generation: AtomicU64,
    closes: AtomicU64,
    exits: AtomicU64,
}

impl ConsumerInner {
    /// Release the current connection
    ///
    /// `Some(generation)` is a pump releasing itself and only succeeds while
    /// that generation is current; the pump is not aborted. `None` is a
    /// manual stop that aborts whatever is open. Returns whether a
    /// connection was closed.
    fn release(&self, generation: Option<u64>) -> bool {
        let mut slot = self.connection.lock();
        let current = match (slot.as_ref(), generation) {
            (Some(conn), Some(generation)) if conn.generation != generation => return false,
            // A stale pump must not touch a start() that is still connecting
            (None, Some(_)) => return false,
            (None, None) => {
                self.streaming.send_replace(false);
                return false;
            }
            (Some(conn), _) => conn.generation,
        };

        if let Some(conn) = slot.take() {
            if generation.is_none() {
                conn.abort.abort();
            }
        }
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.streaming.send_replace(false);
        debug!(generation = current, "Connection released");
        true
    }

    /// Append a tick payload if `generation` is still the open connection
    fn append(&self, generation: u64, payload: String) -> bool {
        let slot = self.connection.lock();
        if slot.as_ref().map(|conn| conn.generation) != Some(generation) {
            return false;
        }
        let len = {
            let mut log = self.log.lock();
            log.push(payload);
            log.len()
        };
        drop(slot);
        self.log_len.send_replace(len);
        true
    }
}

/// Consumes timer streams from an [`EventSource`]
///
/// Cheap to clone; clones share the log and the connection.
pub struct TimerStreamConsumer<S: EventSource> {
    source: Arc<S>,
    inner: Arc<ConsumerInner>,
}

impl<S: EventSource> Clone for TimerStreamConsumer<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: EventSource> TimerStreamConsumer<S> {
    /// Create a stopped consumer with an empty log
    pub fn new(source: S) -> Self {
        let (streaming, _) = watch::channel(false);
        let (log_len, _) = watch::channel(0);
        Self {
            source: Arc::new(source),
            inner: Arc::new(ConsumerInner {
                log: Mutex::new(Vec::new()),
                streaming,
                log_len,
                connection: Mutex::new(None),
                generation: AtomicU64::new(0),
                closes: AtomicU64::new(0),
                exits: AtomicU64::new(0),
            }),
        }
    }

    /// The event source this consumer reads from
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Open a stream and start appending its ticks to the log
    ///
    /// No-op while already streaming. If the source fails to open, the
    /// consumer returns to stopped and the error is returned.
    pub async fn start(&self) -> Result<(), StreamError> {
        let claimed = self.inner.streaming.send_if_modified(|streaming| {
            if *streaming {
                false
            } else {
                *streaming = true;
                true
            }
        });
        if !claimed {
            debug!("Already streaming, start ignored");
            return Ok(());
        }

        let subscription = match self.source.open().await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.inner.streaming.send_replace(false);
                return Err(e);
            }
        };

        let mut slot = self.inner.connection.lock();
        if !*self.inner.streaming.borrow() {
            // stop() ran while the connection was opening
            debug!("Stopped while connecting, dropping subscription");
            return Ok(());
        }
        if let Some(conn) = slot.as_ref() {
            // Another start() installed its connection after a stop in between
            debug!(generation = conn.generation, "Connection already open, dropping subscription");
            return Ok(());
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        let span = tracing::info_span!("stream_consumer", source = self.source.name(), generation);
        let handle = tokio::spawn(pump(inner, subscription, generation).instrument(span));
        *slot = Some(Connection {
            generation,
            abort: handle.abort_handle(),
        });
        info!(source = self.source.name(), generation, "Stream started");
        Ok(())
    }

    /// Close the connection if one is open
    ///
    /// Idempotent: calling it while stopped closes nothing. The log is kept.
    pub fn stop(&self) {
        if self.inner.release(None) {
            info!("Stream stopped");
        }
    }

    /// Copy of the log lines in arrival order
    #[must_use]
    pub fn log(&self) -> Vec<String> {
        self.inner.log.lock().clone()
    }

    /// Number of log lines
    #[must_use]
    pub fn log_len(&self) -> usize {
        self.inner.log.lock().len()
    }

    /// Whether a connection is open
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        *self.inner.streaming.borrow()
    }

    /// Watch the streaming flag
    #[must_use]
    pub fn subscribe_streaming(&self) -> watch::Receiver<bool> {
        self.inner.streaming.subscribe()
    }

    /// Watch the log length
    #[must_use]
    pub fn subscribe_log(&self) -> watch::Receiver<usize> {
        self.inner.log_len.subscribe()
    }

    /// Connections actually closed, by stop, exit, or end of stream
    #[must_use]
    pub fn closes(&self) -> u64 {
        self.inner.closes.load(Ordering::SeqCst)
    }

    /// Exit events received
    #[must_use]
    pub fn exits_received(&self) -> u64 {
        self.inner.exits.load(Ordering::SeqCst)
    }
}

async fn pump(inner: Arc<ConsumerInner>, mut subscription: Subscription, generation: u64) {
    while let Some(event) = subscription.recv().await {
        match event.kind {
            StreamEventKind::Tick => {
                if !inner.append(generation, event.payload) {
                    return;
                }
            }
            StreamEventKind::Exit => {
                inner.exits.fetch_add(1, Ordering::SeqCst);
                info!("Exit received");
                inner.release(Some(generation));
                return;
            }
        }
    }

    debug!("Stream ended without exit");
    inner.release(Some(generation));
}
