//! In-process event source backed by an embedded producer

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{EventSource, StreamError, Subscription};
use crate::stream::TimerStreamProducer;

/// Opens sessions directly on a [`TimerStreamProducer`]
#[derive(Clone, Debug)]
pub struct InProcessSource {
    producer: TimerStreamProducer,
}

impl InProcessSource {
    /// Create a source over the given producer
    #[must_use]
    pub fn new(producer: TimerStreamProducer) -> Self {
        Self { producer }
    }

    /// The embedded producer
    #[must_use]
    pub fn producer(&self) -> &TimerStreamProducer {
        &self.producer
    }
}

#[async_trait]
impl EventSource for InProcessSource {
    fn name(&self) -> &str {
        "in-process"
    }

    async fn open(&self) -> Result<Subscription, StreamError> {
        Ok(self
            .producer
            .open(CancellationToken::new())
            .into_subscription())
    }
}
