use std::sync::Arc;

use alert_store_common::{Alert, AlertSummary};
use alert_store_storage::{DocumentStore, StoreError};
use tracing::debug;

/// Appends non-internal alerts to each chain's capped history documents.
/// The collection is the chain (`parent_id`).
#[derive(Debug, Clone)]
pub struct HistoryAggregator {
    store: Arc<dyn DocumentStore>,
    alerts_per_document: u32,
}

impl HistoryAggregator {
    pub fn new(store: Arc<dyn DocumentStore>, alerts_per_document: u32) -> Self {
        Self {
            store,
            alerts_per_document,
        }
    }

    /// Returns whether the alert was recorded. Internal alerts never are.
    pub async fn append_alert(&self, alert: &Alert) -> Result<bool, StoreError> {
        if alert.is_internal() {
            return Ok(false);
        }

        self.store
            .push_alert(
                &alert.parent_id,
                AlertSummary::from_alert(alert),
                alert.timestamp,
                self.alerts_per_document,
            )
            .await?;

        debug!(
            parent_id = %alert.parent_id,
            origin_id = %alert.origin_id,
            "Alert saved in history"
        );
        Ok(true)
    }
}
