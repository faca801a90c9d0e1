//! HTTP Event Source
//!
//! Opens `GET <url>` with `Accept: text/event-stream` and decodes the body
//! in a reader task.
//!
//! # Architecture
//!
//! ```text
//! reqwest body ──bytes──► SseDecoder ──frames──► time/exit filter ──► Subscription
//!                                                                      │
//!                           CancellationToken ◄──── DropGuard ◄────────┘
//! ```
//!
//! The reader stops on the `exit` event, at the end of the body, on a body
//! error, or as soon as the subscription is dropped (which also drops the
//! response and closes the connection).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument};

use super::{EventSource, StreamError, Subscription};
use crate::stream::sse::SseDecoder;
use crate::stream::StreamEvent;

/// Default stream URL
pub const DEFAULT_STREAM_URL: &str = "http://127.0.0.1:5173/stream-resource";

/// Events buffered between the reader task and the consumer
const CHANNEL_CAPACITY: usize = 32;

/// Event source that reads a timer stream over HTTP
#[derive(Clone, Debug)]
pub struct HttpEventSource {
    url: String,
    http_client: reqwest::Client,
}

impl HttpEventSource {
    /// Create a source for the given stream URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            // No overall timeout: the response body is long-lived
            http_client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create from the `TALLY_STREAM_URL` environment variable
    #[must_use]
    pub fn from_env() -> Self {
        let url = std::env::var("TALLY_STREAM_URL").unwrap_or_else(|_| DEFAULT_STREAM_URL.into());
        Self::new(url)
    }

    /// Stream URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for HttpEventSource {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_URL)
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn open(&self) -> Result<Subscription, StreamError> {
        let response = self
            .http_client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, status = status.as_u16(), "Event stream request rejected");
            return Err(StreamError::Status(status.as_u16()));
        }
        debug!(url = %self.url, "Event stream connected");

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        tokio::spawn(
            read_events(response.bytes_stream(), tx, cancel.clone())
                .instrument(tracing::debug_span!("http_event_source", url = %self.url)),
        );

        Ok(Subscription::with_guard(rx, cancel.drop_guard()))
    }
}

/// Decode an event-stream body and forward `time` and `exit` events
async fn read_events<S, B, E>(body: S, tx: mpsc::Sender<StreamEvent>, cancel: CancellationToken)
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Subscription dropped, closing event stream");
                return;
            }
            chunk = body.next() => chunk,
        };

        let bytes = match chunk {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                warn!(error = %e, "Event stream body failed");
                return;
            }
            None => {
                debug!(pending = decoder.available(), "Event stream body ended");
                return;
            }
        };

        decoder.push(bytes.as_ref());
        while let Some(frame) = decoder.decode() {
            let Some(event) = frame.into_stream_event() else {
                continue;
            };
            let is_exit = event.is_exit();
            if tx.send(event).await.is_err() {
                // Receiver dropped, stop streaming
                return;
            }
            if is_exit {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use pretty_assertions::assert_eq;

    use super::*;

    async fn collect(chunks: Vec<Result<&'static str, String>>) -> Vec<StreamEvent> {
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        read_events(stream::iter(chunks), tx, CancellationToken::new()).await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_forwards_ticks_and_exit() {
        let events = collect(vec![
            Ok("event: time\ndata: Timer: 1 sec"),
            Ok("onds\n\n: keep-alive\n\nevent: time\ndata: Timer: 2 seconds\n\n"),
            Ok("event: exit\ndata: exited\n\n"),
        ])
        .await;

        assert_eq!(
            events,
            vec![StreamEvent::tick(1), StreamEvent::tick(2), StreamEvent::exit()]
        );
    }

    #[tokio::test]
    async fn test_stops_after_exit() {
        let events = collect(vec![Ok(
            "event: exit\ndata: exited\n\nevent: time\ndata: Timer: 9 seconds\n\n",
        )])
        .await;

        assert_eq!(events, vec![StreamEvent::exit()]);
    }

    #[tokio::test]
    async fn test_ignores_other_event_names() {
        let events = collect(vec![Ok(
            "data: hello\n\nevent: ping\ndata: x\n\nevent: time\ndata: Timer: 1 seconds\n\n",
        )])
        .await;

        assert_eq!(events, vec![StreamEvent::tick(1)]);
    }

    #[tokio::test]
    async fn test_body_error_ends_subscription() {
        let events = collect(vec![
            Ok("event: time\ndata: Timer: 1 seconds\n\n"),
            Err("connection reset".to_string()),
            Ok("event: time\ndata: Timer: 2 seconds\n\n"),
        ])
        .await;

        assert_eq!(events, vec![StreamEvent::tick(1)]);
    }

    #[tokio::test]
    async fn test_cancel_stops_reader() {
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let body = stream::iter(vec![Ok::<_, String>("event: time\ndata: Timer: 1 seconds\n\n")]);
        read_events(body, tx, cancel).await;

        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_connect_failure() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let source = HttpEventSource::new("http://127.0.0.1:9/stream-resource");
        let result = source.open().await;
        assert!(matches!(result, Err(StreamError::Connect(_))));
    }
}
