//! Tally Daemon - HTTP Server
//!
//! Serves the timer event stream, the user-management routes, and the example
//! API over axum. See [`routes`] for the route table.
//!
//! # Usage
//!
//! ```ignore
//! use tally_core::TallyConfigFile;
//! use tally_daemon::DaemonServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = DaemonServer::new(TallyConfigFile::default());
//!     server.run(async { let _ = tokio::signal::ctrl_c().await; }).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::AppError;
pub use server::DaemonServer;
pub use state::AppState;
