use alert_store::{
    amqp::AmqpBroker,
    broker::BrokerError,
    cli::Options,
    consumer::{AlertPipeline, EventConsumer},
    initializers::{init_tracing, shutdown_signal, validate_metrics},
    liveness::LivenessReporter,
};
use alert_store_storage::Stores;
use clap::Parser;
use eyre::WrapErr;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const CONSUMER_TAG: &str = "alert_store";

#[tokio::main]
async fn main() {
    let opts = Options::parse();
    init_tracing(&opts);

    if let Err(error) = run(opts).await {
        error!(error = ?error, "Alert store stopped");
        std::process::exit(1);
    }
}

async fn run(opts: Options) -> eyre::Result<()> {
    validate_metrics(&opts).wrap_err("Invalid metric key configuration")?;

    let stores = Stores::open(opts.engine, &opts.remote_store_config())
        .await
        .wrap_err("Failed to open alert storage")?;

    let cancel_token = CancellationToken::new();
    tokio::spawn({
        let cancel_token = cancel_token.clone();
        async move {
            shutdown_signal().await;
            info!("Server shut down started...");
            cancel_token.cancel();
        }
    });

    let broker = match AmqpBroker::connect_till_successful(
        &opts.rabbitmq_url,
        opts.rabbitmq_retry_delay(),
        &cancel_token,
    )
    .await
    {
        Ok(broker) => broker,
        Err(BrokerError::Cancelled) => {
            info!("Shutdown requested before RabbitMQ was reachable");
            return Ok(());
        }
        Err(error) => return Err(error).wrap_err("Failed to connect to RabbitMQ"),
    };

    let topology = opts.topology();
    broker
        .declare_topology(&topology)
        .await
        .wrap_err("Failed to initialise RabbitMQ topology")?;
    let subscription = broker
        .subscribe(&topology.alert_queue, CONSUMER_TAG)
        .await
        .wrap_err("Failed to subscribe to the alert queue")?;

    let consumer = EventConsumer::new(
        AlertPipeline::from_stores(&stores, opts.alerts_per_document),
        LivenessReporter::new(
            opts.component_name.as_str(),
            broker.heartbeat_publisher(&topology),
        ),
    );

    let result = consumer.run(subscription, cancel_token).await;

    if let Err(error) = broker.close().await {
        warn!(error = %error, "Failed to close RabbitMQ connection cleanly");
    }
    info!(component = %opts.component_name, "Alert store stopped");

    result.wrap_err("Alert consumer failed")
}
