use std::fmt::Debug;

use alert_store_common::{AlertSummary, document::ALERT_DOC_TYPE};
use mongodb::{
    Client, Database,
    bson::{Document, doc},
};
use tracing::debug;

use crate::api::DocumentStore;
use crate::error::StoreError;

/// Document store backed by MongoDB. One collection per chain.
pub struct MongoStore {
    database: Database,
}

impl Debug for MongoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MongoStore")
    }
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self {
            database: client.database(db_name),
        })
    }
}

#[async_trait::async_trait]
impl DocumentStore for MongoStore {
    async fn push_alert(
        &self,
        collection: &str,
        summary: AlertSummary,
        timestamp: f64,
        capacity: u32,
    ) -> Result<(), StoreError> {
        let (filter, update) = push_alert_update(summary, timestamp, capacity);
        let result = self
            .database
            .collection::<Document>(collection)
            .update_one(filter, update)
            .upsert(true)
            .await?;

        debug!(
            collection,
            matched = result.matched_count,
            upserted = result.upserted_id.is_some(),
            "Alert pushed into aggregation document"
        );
        Ok(())
    }
}

/// Filter and update of the single upsert behind `push_alert`. The filter
/// matches the open document; when it matches nothing the server inserts
/// `{doc_type}` with the operators applied, seeding `n_alerts = 1` and
/// `first = last = timestamp`.
fn push_alert_update(
    summary: AlertSummary,
    timestamp: f64,
    capacity: u32,
) -> (Document, Document) {
    let filter = doc! {
        "doc_type": ALERT_DOC_TYPE,
        "n_alerts": { "$lt": i64::from(capacity) },
    };
    let update = doc! {
        "$push": {
            "alerts": {
                "origin": summary.origin,
                "alert_name": summary.alert_name,
                "severity": summary.severity,
                "message": summary.message,
                "metric": summary.metric,
                "timestamp": summary.timestamp,
            }
        },
        "$min": { "first": timestamp },
        "$max": { "last": timestamp },
        "$inc": { "n_alerts": 1 },
    };
    (filter, update)
}
