use std::fmt::Debug;

use redis::{AsyncCommands, aio::MultiplexedConnection};

use crate::api::KeyValueStore;
use crate::error::StoreError;

/// Key-value store backed by Redis hashes.
///
/// When a namespace is configured every key is stored as `<namespace>:<key>`;
/// callers always see the bare key.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
    namespace: Option<String>,
}

impl Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl RedisStore {
    pub async fn connect(url: &str, namespace: Option<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            connection,
            namespace,
        })
    }
}

fn namespaced_key(namespace: Option<&str>, key: &str) -> String {
    match namespace {
        Some(namespace) => format!("{namespace}:{key}"),
        None => key.to_owned(),
    }
}

fn strip_namespace(namespace: Option<&str>, key: String) -> Option<String> {
    match namespace {
        Some(namespace) => key
            .strip_prefix(namespace)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::to_owned),
        None => Some(key),
    }
}

/// `KEYS` pattern matching every key that starts with the namespaced `prefix`.
fn prefix_pattern(namespace: Option<&str>, prefix: &str) -> String {
    let mut pattern = String::new();
    for c in namespaced_key(namespace, prefix).chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn hset(&self, name: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        connection
            .hset::<_, _, _, ()>(namespaced_key(self.namespace.as_deref(), name), field, value)
            .await?;
        Ok(())
    }

    async fn hkeys(&self, name: &str) -> Result<Vec<String>, StoreError> {
        let mut connection = self.connection.clone();
        Ok(connection
            .hkeys::<_, Vec<String>>(namespaced_key(self.namespace.as_deref(), name))
            .await?)
    }

    async fn hremove(&self, name: &str, fields: &[String]) -> Result<u64, StoreError> {
        // HDEL needs at least one field
        if fields.is_empty() {
            return Ok(0);
        }
        let mut connection = self.connection.clone();
        Ok(connection
            .hdel::<_, _, u64>(namespaced_key(self.namespace.as_deref(), name), fields.to_vec())
            .await?)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut connection = self.connection.clone();
        let pattern = prefix_pattern(self.namespace.as_deref(), prefix);
        let keys = connection.keys::<_, Vec<String>>(pattern).await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| strip_namespace(self.namespace.as_deref(), key))
            .collect())
    }
}
