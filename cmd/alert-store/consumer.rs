use std::time::SystemTime;

use alert_store_common::{Alert, heartbeat::unix_timestamp};
use alert_store_storage::{StoreError, Stores};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    aggregator::HistoryAggregator,
    broker::{BrokerError, ConfirmedPublisher, Delivery, Subscription},
    liveness::{HeartbeatError, LivenessReporter},
    reconciler::{ReconcileError, StateReconciler},
};

/// A failure confined to one message: logged, acknowledged, no heartbeat.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to decode alert: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to update alert metrics: {0}")]
    Reconcile(#[from] ReconcileError),
    #[error("failed to save alert history: {0}")]
    Store(#[from] StoreError),
}

/// A failure that stops the consumer; the supervisor is expected to restart it.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("failed to acknowledge alert: {0}")]
    Ack(#[source] BrokerError),
    #[error("broker error while consuming: {0}")]
    Broker(#[source] BrokerError),
    #[error("alert subscription was closed by the broker")]
    SubscriptionClosed,
    #[error(transparent)]
    Heartbeat(HeartbeatError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Processed { heartbeat_delivered: bool },
    Failed,
}

/// Applies one alert to both stores. The two writes are independent: a
/// failure in the second leaves the first in place.
#[derive(Debug, Clone)]
pub struct AlertPipeline {
    reconciler: StateReconciler,
    aggregator: HistoryAggregator,
}

impl AlertPipeline {
    pub fn new(reconciler: StateReconciler, aggregator: HistoryAggregator) -> Self {
        Self {
            reconciler,
            aggregator,
        }
    }

    pub fn from_stores(stores: &Stores, alerts_per_document: u32) -> Self {
        Self::new(
            StateReconciler::new(stores.snapshots.clone()),
            HistoryAggregator::new(stores.documents.clone(), alerts_per_document),
        )
    }

    pub async fn process(&self, body: &[u8]) -> Result<Alert, ProcessError> {
        let alert = Alert::from_slice(body)?;
        debug!(alert = ?alert, "Received alert. Now processing this data");

        self.reconciler.apply(&alert).await?;
        self.aggregator.append_alert(&alert).await?;
        Ok(alert)
    }
}

/// Single worker draining the alert subscription one message at a time.
pub struct EventConsumer<P> {
    pipeline: AlertPipeline,
    reporter: LivenessReporter<P>,
}

impl<P: ConfirmedPublisher> EventConsumer<P> {
    pub fn new(pipeline: AlertPipeline, reporter: LivenessReporter<P>) -> Self {
        Self { pipeline, reporter }
    }

    /// Processes, acknowledges exactly once, then reports liveness if
    /// processing succeeded. Only ack failures and heartbeat failures other
    /// than non-delivery are returned as errors.
    pub async fn handle_delivery<D: Delivery>(
        &self,
        delivery: &D,
    ) -> Result<DeliveryOutcome, ConsumerError> {
        let processed = self.pipeline.process(delivery.body()).await;
        if let Err(error) = &processed {
            error!(
                error = %error,
                body = %String::from_utf8_lossy(delivery.body()),
                "Error when processing alert"
            );
        }

        // Unprocessable alerts are acknowledged too, so they are not redelivered.
        delivery.ack().await.map_err(ConsumerError::Ack)?;

        if processed.is_err() {
            return Ok(DeliveryOutcome::Failed);
        }

        match self.reporter.report(unix_timestamp(SystemTime::now())).await {
            Ok(()) => Ok(DeliveryOutcome::Processed {
                heartbeat_delivered: true,
            }),
            Err(HeartbeatError::NotDelivered(reason)) => {
                warn!(reason = %reason, "Heartbeat was not delivered");
                Ok(DeliveryOutcome::Processed {
                    heartbeat_delivered: false,
                })
            }
            Err(error) => Err(ConsumerError::Heartbeat(error)),
        }
    }

    /// Consumes until `shutdown` fires or a fatal error occurs. Cancellation is
    /// only observed between messages, so an in-flight alert always completes.
    pub async fn run<S: Subscription>(
        &self,
        mut subscription: S,
        shutdown: CancellationToken,
    ) -> Result<(), ConsumerError> {
        info!(
            component = %self.reporter.component_name(),
            "Listening for alerts"
        );

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping alert consumption");
                    return Ok(());
                }
                next = subscription.next_delivery() => next,
            };

            let delivery = match next {
                Some(Ok(delivery)) => delivery,
                Some(Err(error)) => return Err(ConsumerError::Broker(error)),
                None => return Err(ConsumerError::SubscriptionClosed),
            };

            self.handle_delivery(&delivery).await?;
        }
    }
}
