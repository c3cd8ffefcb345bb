use std::{fmt::Display, str::FromStr, time::Duration};

use alert_store_common::document::DEFAULT_ALERTS_PER_DOCUMENT;
use alert_store_storage::{EngineType, RemoteStoreConfig};
use clap::Parser as ClapParser;
use tracing::Level;

use crate::amqp::Topology;

#[derive(ClapParser, Debug, Clone)]
#[command(
    name = "alert-store",
    version,
    about = "Persists alerts from the message bus into the history and latest-state stores"
)]
pub struct Options {
    #[arg(
        long = "component-name",
        default_value = "Alert Store",
        value_name = "NAME",
        help = "Name reported in heartbeats.",
        env = "ALERT_STORE_COMPONENT_NAME"
    )]
    pub component_name: String,
    #[arg(
        long = "rabbitmq.url",
        default_value = "amqp://127.0.0.1:5672/%2f",
        value_name = "URL",
        help_heading = "Broker options",
        env = "ALERT_STORE_RABBITMQ_URL"
    )]
    pub rabbitmq_url: String,
    #[arg(
        long = "rabbitmq.retry-delay-ms",
        default_value_t = 5000,
        value_name = "MILLISECONDS",
        help = "Delay between broker connection attempts.",
        help_heading = "Broker options",
        env = "ALERT_STORE_RABBITMQ_RETRY_DELAY_MS"
    )]
    pub rabbitmq_retry_delay_ms: u64,
    #[arg(
        long = "store.exchange",
        default_value = "store",
        help_heading = "Broker options",
        env = "ALERT_STORE_STORE_EXCHANGE"
    )]
    pub store_exchange: String,
    #[arg(
        long = "store.queue",
        default_value = "alert_store_queue",
        help_heading = "Broker options",
        env = "ALERT_STORE_QUEUE"
    )]
    pub alert_queue: String,
    #[arg(
        long = "store.routing-key",
        default_value = "alert",
        help_heading = "Broker options",
        env = "ALERT_STORE_ROUTING_KEY"
    )]
    pub alert_routing_key: String,
    #[arg(
        long = "health.exchange",
        default_value = "health_check",
        help_heading = "Broker options",
        env = "ALERT_STORE_HEALTH_EXCHANGE"
    )]
    pub health_exchange: String,
    #[arg(
        long = "health.routing-key",
        default_value = "heartbeat.worker",
        help_heading = "Broker options",
        env = "ALERT_STORE_HEARTBEAT_ROUTING_KEY"
    )]
    pub heartbeat_routing_key: String,
    #[arg(
        long = "engine",
        default_value_t = EngineType::Remote,
        value_name = "ENGINE",
        help = "Storage engines to use.",
        long_help = "`remote` uses MongoDB and Redis. `memory` keeps both stores in process and loses them on exit.",
        help_heading = "Storage options",
        env = "ALERT_STORE_ENGINE"
    )]
    pub engine: EngineType,
    #[arg(
        long = "mongo.uri",
        default_value = "mongodb://127.0.0.1:27017",
        value_name = "URI",
        help_heading = "Storage options",
        env = "ALERT_STORE_MONGO_URI"
    )]
    pub mongo_uri: String,
    #[arg(
        long = "mongo.db",
        default_value = "panicdb",
        value_name = "DATABASE",
        help_heading = "Storage options",
        env = "ALERT_STORE_MONGO_DB"
    )]
    pub mongo_db: String,
    #[arg(
        long = "redis.url",
        default_value = "redis://127.0.0.1:6379",
        value_name = "URL",
        help_heading = "Storage options",
        env = "ALERT_STORE_REDIS_URL"
    )]
    pub redis_url: String,
    #[arg(
        long = "redis.namespace",
        value_name = "NAMESPACE",
        help = "Prefix every Redis key with `<NAMESPACE>:`.",
        help_heading = "Storage options",
        env = "ALERT_STORE_REDIS_NAMESPACE"
    )]
    pub redis_namespace: Option<String>,
    #[arg(
        long = "alerts.per-document",
        default_value_t = DEFAULT_ALERTS_PER_DOCUMENT,
        value_parser = clap::value_parser!(u32).range(1..),
        value_name = "COUNT",
        help = "Alerts held by one history document before a new one is started.",
        help_heading = "Storage options",
        env = "ALERT_STORE_ALERTS_PER_DOCUMENT"
    )]
    pub alerts_per_document: u32,
    #[arg(
        long = "metrics.permitted",
        value_name = "METRIC_LIST",
        value_delimiter = ',',
        num_args = 1..,
        help = "Comma separated metric identifiers producers may emit; each must have a registered key builder.",
        help_heading = "Storage options",
        env = "ALERT_STORE_PERMITTED_METRICS"
    )]
    pub permitted_metrics: Vec<String>,
    #[arg(
        long = "log.level",
        default_value_t = Level::INFO,
        value_name = "LOG_LEVEL",
        help = "The verbosity level used for logs.",
        long_help = "Possible values: info, debug, trace, warn, error",
        env = "ALERT_STORE_LOG_LEVEL"
    )]
    pub log_level: Level,
    #[arg(
        long = "log.color",
        default_value_t = LogColor::Auto,
        help = "Output logs with ANSI color codes.",
        long_help = "Possible values: auto, always, never",
        env = "ALERT_STORE_LOG_COLOR"
    )]
    pub log_color: LogColor,
}

impl Options {
    pub fn topology(&self) -> Topology {
        Topology {
            store_exchange: self.store_exchange.clone(),
            alert_queue: self.alert_queue.clone(),
            alert_routing_key: self.alert_routing_key.clone(),
            health_exchange: self.health_exchange.clone(),
            heartbeat_routing_key: self.heartbeat_routing_key.clone(),
        }
    }

    pub fn remote_store_config(&self) -> RemoteStoreConfig {
        RemoteStoreConfig {
            mongo_uri: self.mongo_uri.clone(),
            mongo_db: self.mongo_db.clone(),
            redis_url: self.redis_url.clone(),
            redis_namespace: self.redis_namespace.clone(),
        }
    }

    pub fn rabbitmq_retry_delay(&self) -> Duration {
        Duration::from_millis(self.rabbitmq_retry_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogColor {
    #[default]
    Auto,
    Always,
    Never,
}

impl Display for LogColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogColor::Auto => write!(f, "auto"),
            LogColor::Always => write!(f, "always"),
            LogColor::Never => write!(f, "never"),
        }
    }
}

impl FromStr for LogColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(LogColor::Auto),
            "always" => Ok(LogColor::Always),
            "never" => Ok(LogColor::Never),
            _ => Err(format!(
                "Invalid log color: {s}. Expected auto, always or never"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_store_topology() {
        let parsed = Options::try_parse_from(["alert-store"]);
        assert!(parsed.is_ok());
        let Ok(options) = parsed else { return };

        let topology = options.topology();
        assert_eq!(topology.store_exchange, "store");
        assert_eq!(topology.alert_queue, "alert_store_queue");
        assert_eq!(topology.alert_routing_key, "alert");
        assert_eq!(topology.health_exchange, "health_check");
        assert_eq!(topology.heartbeat_routing_key, "heartbeat.worker");
        assert_eq!(options.alerts_per_document, 1000);
        assert_eq!(options.engine, EngineType::Remote);
        assert!(options.permitted_metrics.is_empty());
    }

    #[test]
    fn parses_permitted_metrics_list() {
        let parsed = Options::try_parse_from([
            "alert-store",
            "--metrics.permitted",
            "missed_blocks,system_is_down",
            "--engine",
            "memory",
        ]);
        assert!(parsed.is_ok());
        let Ok(options) = parsed else { return };

        assert_eq!(
            options.permitted_metrics,
            vec!["missed_blocks".to_owned(), "system_is_down".to_owned()]
        );
        assert_eq!(options.engine, EngineType::InMemory);
    }

    #[test]
    fn rejects_empty_documents() {
        assert!(Options::try_parse_from(["alert-store", "--alerts.per-document", "0"]).is_err());
    }
}
