use alert_store_common::Heartbeat;
use thiserror::Error;

use crate::broker::{BrokerError, ConfirmedPublisher, PublishError};

#[derive(Debug, Error)]
pub enum HeartbeatError {
    /// Recoverable: the broker did not confirm the heartbeat.
    #[error("heartbeat was not delivered: {0}")]
    NotDelivered(String),
    #[error("failed to encode heartbeat: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to publish heartbeat: {0}")]
    Publish(#[from] BrokerError),
}

impl From<PublishError> for HeartbeatError {
    fn from(error: PublishError) -> Self {
        match error {
            PublishError::NotDelivered(reason) => HeartbeatError::NotDelivered(reason),
            PublishError::Broker(error) => HeartbeatError::Publish(error),
        }
    }
}

/// Publishes `{component_name, is_alive: true, timestamp}` after each alert
/// that was processed without error.
#[derive(Debug, Clone)]
pub struct LivenessReporter<P> {
    component_name: String,
    publisher: P,
}

impl<P: ConfirmedPublisher> LivenessReporter<P> {
    pub fn new(component_name: impl Into<String>, publisher: P) -> Self {
        Self {
            component_name: component_name.into(),
            publisher,
        }
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    pub async fn report(&self, timestamp: f64) -> Result<(), HeartbeatError> {
        let heartbeat = Heartbeat::alive(self.component_name.as_str(), timestamp);
        let payload = serde_json::to_vec(&heartbeat)?;
        self.publisher.publish_confirmed(&payload).await?;
        Ok(())
    }
}
