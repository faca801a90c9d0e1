//! Timer Streams
//!
//! Server-side producer and client-side consumer of the timer event stream.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   StreamEvent    ┌──────────────────────┐
//! │ TimerStreamProducer  │ ───────────────► │ TimerStreamConsumer  │
//! │  StreamSession/task  │  (EventSource)   │  append-only log     │
//! └──────────────────────┘                  └──────────────────────┘
//!            ▲                                          │
//!            └──────────── cancel on disconnect ────────┘
//! ```
//!
//! A session emits `tick(1) … tick(limit)` and then exactly one `exit`.

pub mod consumer;
pub mod event;
pub mod producer;
pub mod session;
pub mod sse;

pub use consumer::TimerStreamConsumer;
pub use event::{StreamEvent, StreamEventKind, EXIT_PAYLOAD};
pub use producer::{ProducerSnapshot, StreamConfig, TimerStream, TimerStreamProducer};
pub use session::{SessionId, SessionState, StreamSession};
pub use sse::{SseDecoder, SseFrame};
