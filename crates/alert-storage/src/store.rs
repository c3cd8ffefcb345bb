use std::{fmt, str::FromStr, sync::Arc};

use tracing::info;

use crate::api::{DocumentStore, KeyValueStore};
use crate::error::StoreError;
use crate::store_db::{
    in_memory::{InMemoryDocumentStore, InMemoryKeyValueStore},
    mongo::MongoStore,
    redis::RedisStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineType {
    InMemory,
    #[default]
    Remote,
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineType::InMemory => write!(f, "memory"),
            EngineType::Remote => write!(f, "remote"),
        }
    }
}

impl FromStr for EngineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(EngineType::InMemory),
            "remote" => Ok(EngineType::Remote),
            _ => Err(format!("Invalid engine type: {s}. Expected memory or remote")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    pub mongo_uri: String,
    pub mongo_db: String,
    pub redis_url: String,
    pub redis_namespace: Option<String>,
}

/// The two backing stores, owned by the process and handed to the pipeline.
#[derive(Debug, Clone)]
pub struct Stores {
    pub documents: Arc<dyn DocumentStore>,
    pub snapshots: Arc<dyn KeyValueStore>,
}

impl Stores {
    pub async fn open(
        engine_type: EngineType,
        config: &RemoteStoreConfig,
    ) -> Result<Self, StoreError> {
        info!("Starting alert storage engines ({engine_type})");
        let stores = match engine_type {
            EngineType::InMemory => Self::in_memory(),
            EngineType::Remote => Self {
                documents: Arc::new(
                    MongoStore::connect(&config.mongo_uri, &config.mongo_db).await?,
                ),
                snapshots: Arc::new(
                    RedisStore::connect(&config.redis_url, config.redis_namespace.clone()).await?,
                ),
            },
        };
        info!("Started alert storage engines");
        Ok(stores)
    }

    pub fn in_memory() -> Self {
        Self {
            documents: Arc::new(InMemoryDocumentStore::new()),
            snapshots: Arc::new(InMemoryKeyValueStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engine_type() {
        assert_eq!("memory".parse::<EngineType>(), Ok(EngineType::InMemory));
        assert_eq!("Remote".parse::<EngineType>(), Ok(EngineType::Remote));
        assert!("sled".parse::<EngineType>().is_err());
    }
}
