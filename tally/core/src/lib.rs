//! Tally Core - Timer Event Streams and User Records
//!
//! This crate holds everything that is independent of the HTTP server: the
//! timer stream producer and consumer, the event-stream decoder, the event
//! sources a consumer can read from, the user store, and configuration.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         tally-daemon                         │
//! │   /stream-resource        /users         /example-api/*      │
//! └──────┬──────────────────────┬────────────────────────────────┘
//!        │ open(token)          │ UserStore
//! ┌──────┴──────────────────────┴────────────────────────────────┐
//! │                          TALLY CORE                          │
//! │  ┌─────────────────────┐   ┌───────────────────────────────┐ │
//! │  │ TimerStreamProducer │   │ MemoryUserStore               │ │
//! │  │  StreamSession/task │   └───────────────────────────────┘ │
//! │  └─────────┬───────────┘                                     │
//! │            │ StreamEvent                                     │
//! │  ┌─────────┴───────────┐   ┌───────────────────────────────┐ │
//! │  │ EventSource         │──►│ TimerStreamConsumer           │ │
//! │  │  in-process | HTTP  │   │  append-only log              │ │
//! │  └─────────────────────┘   └───────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`TimerStreamProducer`]: opens timer sessions, one task per session
//! - [`TimerStreamConsumer`]: reads a stream into a log until `exit` or `stop()`
//! - [`EventSource`]: where a consumer's connection comes from
//! - [`UserStore`]: CRUD collaborator behind the user routes
//!
//! # Quick Start
//!
//! ```ignore
//! use tally_core::{InProcessSource, StreamConfig, TimerStreamConsumer, TimerStreamProducer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let producer = TimerStreamProducer::new(StreamConfig::default());
//!     let consumer = TimerStreamConsumer::new(InProcessSource::new(producer));
//!
//!     consumer.start().await.unwrap();
//!     let mut streaming = consumer.subscribe_streaming();
//!     streaming.wait_for(|s| !*s).await.unwrap();
//!
//!     for line in consumer.log() {
//!         println!("{line}");
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod source;
pub mod stream;
pub mod users;

pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, TallyConfigFile,
};
pub use source::{EventSource, HttpEventSource, InProcessSource, StreamError, Subscription};
pub use stream::{
    ProducerSnapshot, SessionId, SessionState, StreamConfig, StreamEvent, StreamEventKind,
    TimerStream, TimerStreamConsumer, TimerStreamProducer,
};
pub use users::{MemoryUserStore, NewUser, StoreError, User, UserPatch, UserStore};
