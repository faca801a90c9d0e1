//! Daemon Server Implementation
//!
//! Binds the listener, serves the router, and shuts down gracefully:
//! - one axum service over a shared [`AppState`]
//! - request logging through `tower-http`'s `TraceLayer`
//! - on shutdown, every live timer session is cancelled so open event
//!   streams end and their connections can drain
//!
//! ```text
//!                     DaemonServer
//!                          │
//!          ┌───────────────┼───────────────┐
//!          │               │               │
//!   /stream-resource    /users      /example-api/*
//!          │               │
//!  TimerStreamProducer  UserStore
//! ```

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use tally_core::{MemoryUserStore, TallyConfigFile, TimerStreamProducer, UserStore};

use crate::routes;
use crate::state::AppState;

/// The HTTP daemon
pub struct DaemonServer {
    config: TallyConfigFile,
    state: AppState,
}

impl DaemonServer {
    /// Create a server backed by an in-memory user store
    #[must_use]
    pub fn new(config: TallyConfigFile) -> Self {
        Self::with_store(config, Arc::new(MemoryUserStore::new()))
    }

    /// Create a server over the given user store
    #[must_use]
    pub fn with_store(config: TallyConfigFile, users: Arc<dyn UserStore>) -> Self {
        let producer = TimerStreamProducer::new(config.stream.clone());
        Self {
            state: AppState::new(producer, users),
            config,
        }
    }

    /// Shared state handed to the handlers
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Configuration the server was built with
    #[must_use]
    pub fn config(&self) -> &TallyConfigFile {
        &self.config
    }

    /// Application router with request tracing
    pub fn router(&self) -> Router {
        routes::router(self.state.clone()).layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until `shutdown` resolves
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the server fails.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind)
            .await
            .with_context(|| format!("Failed to bind to {}", self.config.bind))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails while running.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let addr = listener.local_addr().context("Listener has no local address")?;
        info!(
            %addr,
            tick_limit = self.config.stream.tick_limit,
            tick_period_ms = self.config.stream.tick_period.as_millis() as u64,
            "Listening for connections"
        );

        let producer = self.state.producer.clone();
        let graceful = async move {
            shutdown.await;
            let cancelled = producer.shutdown();
            info!(cancelled, "Shutdown requested, closing open streams");
        };

        axum::serve(listener, self.router())
            .with_graceful_shutdown(graceful)
            .await
            .context("Server error")?;

        let stats = self.state.producer.stats();
        info!(
            sessions_opened = stats.sessions_opened,
            completed = stats.completed,
            cancelled = stats.cancelled,
            "Server stopped"
        );
        Ok(())
    }
}
