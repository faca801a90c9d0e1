//! Event Sources
//!
//! Where a consumer's events come from. The consumer only sees the
//! [`EventSource`] trait, so the same consumer logic runs against an embedded
//! producer or a remote server.
//!
//! # Design Philosophy
//!
//! An [`EventSource`] opens one connection per call and hands back a
//! [`Subscription`]:
//! - events arrive on a bounded channel in emission order
//! - the channel closes when the connection ends
//! - dropping the subscription closes the connection
//!
//! Implementations handle transport details (in-process channels, HTTP).

mod http;
mod in_process;

pub use http::{HttpEventSource, DEFAULT_STREAM_URL};
pub use in_process::InProcessSource;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

use crate::stream::StreamEvent;

/// Errors opening or reading an event stream
#[derive(Debug, Error)]
pub enum StreamError {
    /// Could not reach the server
    #[error("failed to connect to event stream: {0}")]
    Connect(String),

    /// Server answered with a non-success status
    #[error("event stream returned HTTP {0}")]
    Status(u16),

    /// Source can no longer open connections
    #[error("event source closed")]
    Closed,
}

/// An open connection to a timer stream
///
/// Dropping the subscription closes the connection.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<StreamEvent>,
    _guard: Option<DropGuard>,
}

impl Subscription {
    /// Wrap a bare receiver; dropping it only closes the channel
    #[must_use]
    pub fn new(rx: mpsc::Receiver<StreamEvent>) -> Self {
        Self { rx, _guard: None }
    }

    /// Wrap a receiver whose guard cancels the underlying connection on drop
    #[must_use]
    pub fn with_guard(rx: mpsc::Receiver<StreamEvent>, guard: DropGuard) -> Self {
        Self {
            rx,
            _guard: Some(guard),
        }
    }

    /// Receive the next event, `None` once the connection has ended
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }
}

/// A place timer streams can be opened from
#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    /// Source name for logging
    fn name(&self) -> &str;

    /// Open a new connection
    ///
    /// Each call starts a fresh producer session.
    async fn open(&self) -> Result<Subscription, StreamError>;
}
