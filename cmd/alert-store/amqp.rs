use std::time::Duration;

use futures::StreamExt;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind,
    message::Delivery as LapinDelivery,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
        ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    publisher_confirm::Confirmation,
    types::FieldTable,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::broker::{BrokerError, ConfirmedPublisher, Delivery, PublishError, Subscription};

/// Exchange, queue and routing keys the alert store consumes from and
/// publishes heartbeats to.
#[derive(Debug, Clone)]
pub struct Topology {
    pub store_exchange: String,
    pub alert_queue: String,
    pub alert_routing_key: String,
    pub health_exchange: String,
    pub heartbeat_routing_key: String,
}

/// An AMQP connection with a single channel used both to consume alerts and
/// to publish confirmed heartbeats.
pub struct AmqpBroker {
    connection: Connection,
    channel: Channel,
}

impl AmqpBroker {
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        Ok(Self {
            connection,
            channel,
        })
    }

    /// Retries [`AmqpBroker::connect`] every `retry_delay` until it succeeds or
    /// `cancel` fires.
    pub async fn connect_till_successful(
        url: &str,
        retry_delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<Self, BrokerError> {
        loop {
            match Self::connect(url).await {
                Ok(broker) => {
                    info!("Connected to RabbitMQ");
                    return Ok(broker);
                }
                Err(error) => {
                    warn!(
                        error = %error,
                        retry_in_ms = retry_delay.as_millis(),
                        "Could not connect to RabbitMQ"
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(BrokerError::Cancelled),
                _ = tokio::time::sleep(retry_delay) => {}
            }
        }
    }

    /// Declares the durable store and health-check exchanges, the durable alert
    /// queue and its binding, and enables publisher confirms. Idempotent.
    pub async fn declare_topology(&self, topology: &Topology) -> Result<(), BrokerError> {
        info!(exchange = %topology.store_exchange, "Creating exchange");
        self.channel
            .exchange_declare(
                &topology.store_exchange,
                ExchangeKind::Topic,
                durable_exchange(),
                FieldTable::default(),
            )
            .await?;

        info!(queue = %topology.alert_queue, "Creating queue");
        self.channel
            .queue_declare(
                &topology.alert_queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        info!(
            queue = %topology.alert_queue,
            exchange = %topology.store_exchange,
            routing_key = %topology.alert_routing_key,
            "Binding queue"
        );
        self.channel
            .queue_bind(
                &topology.alert_queue,
                &topology.store_exchange,
                &topology.alert_routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        // One alert in flight at a time
        self.channel
            .basic_qos(1, BasicQosOptions::default())
            .await?;

        info!("Setting delivery confirmation on RabbitMQ channel");
        self.channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        info!(exchange = %topology.health_exchange, "Creating exchange");
        self.channel
            .exchange_declare(
                &topology.health_exchange,
                ExchangeKind::Topic,
                durable_exchange(),
                FieldTable::default(),
            )
            .await?;

        Ok(())
    }

    pub async fn subscribe(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<AmqpSubscription, BrokerError> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        Ok(AmqpSubscription { consumer })
    }

    pub fn heartbeat_publisher(&self, topology: &Topology) -> AmqpPublisher {
        AmqpPublisher {
            channel: self.channel.clone(),
            exchange: topology.health_exchange.clone(),
            routing_key: topology.heartbeat_routing_key.clone(),
        }
    }

    pub async fn close(&self) -> Result<(), BrokerError> {
        self.channel.close(200, "alert store shutting down").await?;
        self.connection.close(200, "alert store shutting down").await?;
        Ok(())
    }
}

fn durable_exchange() -> ExchangeDeclareOptions {
    ExchangeDeclareOptions {
        durable: true,
        ..ExchangeDeclareOptions::default()
    }
}

pub struct AmqpDelivery(LapinDelivery);

#[async_trait::async_trait]
impl Delivery for AmqpDelivery {
    fn body(&self) -> &[u8] {
        &self.0.data
    }

    async fn ack(&self) -> Result<(), BrokerError> {
        self.0.acker.ack(BasicAckOptions::default()).await?;
        Ok(())
    }
}

pub struct AmqpSubscription {
    consumer: Consumer,
}

#[async_trait::async_trait]
impl Subscription for AmqpSubscription {
    type Delivery = AmqpDelivery;

    async fn next_delivery(&mut self) -> Option<Result<AmqpDelivery, BrokerError>> {
        self.consumer
            .next()
            .await
            .map(|delivery| delivery.map(AmqpDelivery).map_err(BrokerError::from))
    }
}

#[derive(Clone)]
pub struct AmqpPublisher {
    channel: Channel,
    exchange: String,
    routing_key: String,
}

#[async_trait::async_trait]
impl ConfirmedPublisher for AmqpPublisher {
    async fn publish_confirmed(&self, payload: &[u8]) -> Result<(), PublishError> {
        let confirm = self
            .channel
            .basic_publish(
                &self.exchange,
                &self.routing_key,
                BasicPublishOptions {
                    mandatory: true,
                    ..BasicPublishOptions::default()
                },
                payload,
                BasicProperties::default()
                    .with_delivery_mode(2)
                    .with_content_type("application/json".into()),
            )
            .await
            .map_err(BrokerError::from)?;

        let confirmation = confirm.await.map_err(BrokerError::from)?;
        confirmation_outcome(confirmation, &self.exchange)
    }
}

/// Only an explicit ack without a returned message counts as delivered.
fn confirmation_outcome(confirmation: Confirmation, exchange: &str) -> Result<(), PublishError> {
    match confirmation {
        Confirmation::Ack(None) => Ok(()),
        Confirmation::Ack(Some(_)) => Err(PublishError::NotDelivered(format!(
            "returned as unroutable by exchange {exchange}"
        ))),
        Confirmation::Nack(_) => Err(PublishError::NotDelivered(format!(
            "nacked by exchange {exchange}"
        ))),
        Confirmation::NotRequested => Err(PublishError::NotDelivered(format!(
            "publisher confirms are not enabled on the channel publishing to {exchange}"
        ))),
    }
}
