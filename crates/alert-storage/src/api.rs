// Storage API for the alert store

use std::fmt::Debug;

use alert_store_common::AlertSummary;

use crate::error::StoreError;

// We need async_trait because the stabilized feature lacks support for object safety
// (i.e. dyn DocumentStore)
#[async_trait::async_trait]
pub trait DocumentStore: Debug + Send + Sync {
    /// Appends `summary` to the collection's open alert document, i.e. the one
    /// with `doc_type = "alert"` and fewer than `capacity` alerts, widening its
    /// `first`/`last` bounds and incrementing `n_alerts`. When no document is
    /// open a new one is created holding only this alert.
    ///
    /// Locating the open document and mutating it is a single atomic step.
    async fn push_alert(
        &self,
        collection: &str,
        summary: AlertSummary,
        timestamp: f64,
        capacity: u32,
    ) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait KeyValueStore: Debug + Send + Sync {
    /// Sets `field` of hash `name`, replacing any previous value.
    async fn hset(&self, name: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// Returns the field names of hash `name`; empty when the hash is absent.
    async fn hkeys(&self, name: &str) -> Result<Vec<String>, StoreError>;

    /// Removes the given fields from hash `name`, returning how many existed.
    async fn hremove(&self, name: &str, fields: &[String]) -> Result<u64, StoreError>;

    /// Returns every key starting with `prefix`. This is a full keyspace scan.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}
