//! Broker seams used by the consumer. The production implementation lives in
//! [`crate::amqp`]; tests substitute scripted fakes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),
    #[error("connection attempt cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum PublishError {
    /// The broker nacked the message or returned it as unroutable.
    #[error("message was not delivered: {0}")]
    NotDelivered(String),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// One received message awaiting acknowledgement.
#[async_trait::async_trait]
pub trait Delivery: Send + Sync {
    fn body(&self) -> &[u8];

    async fn ack(&self) -> Result<(), BrokerError>;
}

/// A manual-acknowledgement subscription to the alert queue.
#[async_trait::async_trait]
pub trait Subscription: Send {
    type Delivery: Delivery;

    /// Waits for the next message. `None` means the broker ended the
    /// subscription.
    async fn next_delivery(&mut self) -> Option<Result<Self::Delivery, BrokerError>>;
}

/// Publishes a payload and waits for the broker's confirmation.
#[async_trait::async_trait]
pub trait ConfirmedPublisher: Send + Sync {
    async fn publish_confirmed(&self, payload: &[u8]) -> Result<(), PublishError>;
}
