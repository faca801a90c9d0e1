//! Shared application state handed to every route

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tally_core::{TimerStreamProducer, UserStore};

/// State shared by all handlers
///
/// Cheap to clone; clones share the producer, the store and the counter.
#[derive(Clone)]
pub struct AppState {
    /// Opens one timer session per `/stream-resource` request
    pub producer: TimerStreamProducer,
    /// Backing store for the user routes
    pub users: Arc<dyn UserStore>,
    /// Requests served by `/example-api/get`
    visits: Arc<AtomicU64>,
}

impl AppState {
    /// Create state over a producer and a user store
    pub fn new(producer: TimerStreamProducer, users: Arc<dyn UserStore>) -> Self {
        Self {
            producer,
            users,
            visits: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Count one visit and return the new total
    pub fn record_visit(&self) -> u64 {
        self.visits.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Visits counted so far
    #[must_use]
    pub fn visits(&self) -> u64 {
        self.visits.load(Ordering::SeqCst)
    }
}
