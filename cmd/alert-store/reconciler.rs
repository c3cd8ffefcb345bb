use std::sync::Arc;

use alert_store_common::{
    Alert, ControlAlert, KeySchemaError, ResetScope, Severity,
    keys::{chain_hash_name, chain_hash_prefix, metric_field_key},
};
use alert_store_storage::{KeyValueStore, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    UnknownMetric(#[from] KeySchemaError),
    #[error("failed to encode snapshot value: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("key-value store error: {0}")]
    Store(#[from] StoreError),
}

/// What applying one alert did to the snapshot store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Swept { hashes: usize, removed: u64 },
    Updated { hash: String, field: String },
    Ignored,
}

#[derive(Serialize)]
struct MetricState<'a> {
    severity: Severity,
    message: &'a str,
}

/// Keeps the per-chain latest-state hashes in line with incoming alerts.
#[derive(Debug, Clone)]
pub struct StateReconciler {
    store: Arc<dyn KeyValueStore>,
}

impl StateReconciler {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn apply(&self, alert: &Alert) -> Result<Reconciliation, ReconcileError> {
        if !alert.is_internal() {
            return self.apply_metric_update(alert).await;
        }

        match ControlAlert::classify(alert) {
            Some(control) => Ok(self.apply_control_alert(&control).await?),
            None => {
                debug!(
                    code = alert.alert_code.code,
                    origin_id = %alert.origin_id,
                    "Internal alert carries no snapshot change"
                );
                Ok(Reconciliation::Ignored)
            }
        }
    }

    /// Removes every field containing the control alert's filter from the
    /// hashes in its scope. Other fields are left untouched.
    pub async fn apply_control_alert(
        &self,
        control: &ControlAlert,
    ) -> Result<Reconciliation, StoreError> {
        let hashes = match control.scope() {
            // There is no index of known chains, so discover them by scanning.
            ResetScope::AllChains => self.store.keys_with_prefix(chain_hash_prefix()).await?,
            ResetScope::Chain(parent_id) => vec![chain_hash_name(&parent_id)],
        };
        let filter = control.field_filter();

        let mut removed = 0;
        for hash in &hashes {
            let matching: Vec<String> = self
                .store
                .hkeys(hash)
                .await?
                .into_iter()
                .filter(|field| field.contains(filter))
                .collect();
            removed += self.store.hremove(hash, &matching).await?;
        }

        debug!(
            control = ?control,
            filter,
            hashes = hashes.len(),
            removed,
            "Reset alert metrics"
        );
        Ok(Reconciliation::Swept {
            hashes: hashes.len(),
            removed,
        })
    }

    /// Overwrites the `(metric, origin)` field of the alert's chain hash with
    /// the alert's severity and message.
    pub async fn apply_metric_update(
        &self,
        alert: &Alert,
    ) -> Result<Reconciliation, ReconcileError> {
        let field = metric_field_key(&alert.metric, &alert.origin_id)?;
        let hash = chain_hash_name(&alert.parent_id);
        let value = serde_json::to_string(&MetricState {
            severity: alert.severity,
            message: &alert.message,
        })?;

        debug!(hash = %hash, field = %field, "Saving alert metric");
        self.store.hset(&hash, &field, &value).await?;

        Ok(Reconciliation::Updated { hash, field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_store_common::{
        AlertCode,
        control::{GITHUB_ALERTER_MANAGER, SYSTEM_ALERTERS_MANAGER},
    };
    use alert_store_storage::InMemoryKeyValueStore;

    fn alert(severity: Severity, metric: &str, origin: &str, parent: &str, message: &str) -> Alert {
        Alert {
            severity,
            alert_code: AlertCode {
                code: 1,
                name: "TestAlert".to_owned(),
            },
            origin_id: origin.to_owned(),
            parent_id: parent.to_owned(),
            message: message.to_owned(),
            metric: metric.to_owned(),
            timestamp: 1.0,
        }
    }

    fn control(code: i64, origin: &str, parent: &str) -> Alert {
        Alert {
            severity: Severity::Internal,
            alert_code: AlertCode {
                code,
                name: "Reset".to_owned(),
            },
            origin_id: origin.to_owned(),
            parent_id: parent.to_owned(),
            message: String::new(),
            metric: String::new(),
            timestamp: 1.0,
        }
    }

    async fn seeded() -> (InMemoryKeyValueStore, StateReconciler) {
        let store = InMemoryKeyValueStore::new();
        for chain in ["hash_p1_chainX", "hash_p1_chainY"] {
            let _ = store.hset(chain, "alert_system1_sys1", "{}").await;
            let _ = store.hset(chain, "alert_system5_sys1", "{}").await;
            let _ = store.hset(chain, "alert_github2_repo", "{}").await;
            let _ = store.hset(chain, "alert_github1_repo", "{}").await;
            let _ = store.hset(chain, "system_monitor_last_seen", "42").await;
        }
        let _ = store.hset("unrelated", "alert_system1_sys1", "{}").await;
        let reconciler = StateReconciler::new(Arc::new(store.clone()));
        (store, reconciler)
    }

    fn fields(store: &InMemoryKeyValueStore, hash: &str) -> Vec<String> {
        store
            .hgetall(hash)
            .map(|fields| fields.into_keys().collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn metric_update_overwrites_previous_value() {
        let store = InMemoryKeyValueStore::new();
        let reconciler = StateReconciler::new(Arc::new(store.clone()));

        let first = alert(Severity::Warning, "missed_blocks", "nodeA", "chainX", "first");
        let second = alert(Severity::Critical, "missed_blocks", "nodeA", "chainX", "second");
        assert!(reconciler.apply(&first).await.is_ok());
        let outcome = reconciler.apply(&second).await;

        assert_eq!(
            outcome.ok(),
            Some(Reconciliation::Updated {
                hash: "hash_p1_chainX".to_owned(),
                field: "alert_node2_nodeA".to_owned(),
            })
        );
        assert_eq!(fields(&store, "hash_p1_chainX").len(), 1);
        assert_eq!(
            store.hget("hash_p1_chainX", "alert_node2_nodeA").ok().flatten(),
            Some(r#"{"severity":"CRITICAL","message":"second"}"#.to_owned())
        );
    }

    #[tokio::test]
    async fn unknown_metric_is_rejected_without_writing() {
        let store = InMemoryKeyValueStore::new();
        let reconciler = StateReconciler::new(Arc::new(store.clone()));

        let result = reconciler
            .apply(&alert(Severity::Info, "not_a_metric", "nodeA", "chainX", "m"))
            .await;

        assert!(matches!(
            result,
            Err(ReconcileError::UnknownMetric(KeySchemaError::UnknownMetric(_)))
        ));
        assert!(fields(&store, "hash_p1_chainX").is_empty());
    }

    #[tokio::test]
    async fn system_reset_all_chains_sweeps_every_chain() {
        let (store, reconciler) = seeded().await;

        let outcome = reconciler
            .apply(&control(5000, SYSTEM_ALERTERS_MANAGER, "*"))
            .await;

        assert_eq!(
            outcome.ok(),
            Some(Reconciliation::Swept {
                hashes: 2,
                removed: 4
            })
        );
        for chain in ["hash_p1_chainX", "hash_p1_chainY"] {
            assert_eq!(
                fields(&store, chain),
                vec![
                    "alert_github1_repo".to_owned(),
                    "alert_github2_repo".to_owned(),
                    "system_monitor_last_seen".to_owned(),
                ]
            );
        }
        // Keys outside the chain-hash namespace are never scanned
        assert_eq!(fields(&store, "unrelated"), vec!["alert_system1_sys1".to_owned()]);
    }

    #[tokio::test]
    async fn system_reset_chain_only_touches_that_chain() {
        let (store, reconciler) = seeded().await;
        let untouched = store.hgetall("hash_p1_chainY").ok();

        let outcome = reconciler
            .apply(&control(5001, SYSTEM_ALERTERS_MANAGER, "chainX"))
            .await;

        assert_eq!(
            outcome.ok(),
            Some(Reconciliation::Swept {
                hashes: 1,
                removed: 2
            })
        );
        assert_eq!(
            fields(&store, "hash_p1_chainX"),
            vec![
                "alert_github1_repo".to_owned(),
                "alert_github2_repo".to_owned(),
                "system_monitor_last_seen".to_owned(),
            ]
        );
        assert_eq!(store.hgetall("hash_p1_chainY").ok(), untouched);
    }

    #[tokio::test]
    async fn github_reset_removes_only_cannot_access_fields() {
        let (store, reconciler) = seeded().await;

        let outcome = reconciler
            .apply(&control(5000, GITHUB_ALERTER_MANAGER, "*"))
            .await;

        assert_eq!(
            outcome.ok(),
            Some(Reconciliation::Swept {
                hashes: 2,
                removed: 2
            })
        );
        for chain in ["hash_p1_chainX", "hash_p1_chainY"] {
            assert!(!fields(&store, chain).contains(&"alert_github2_repo".to_owned()));
            assert!(fields(&store, chain).contains(&"alert_github1_repo".to_owned()));
            assert!(fields(&store, chain).contains(&"alert_system1_sys1".to_owned()));
        }
    }

    #[tokio::test]
    async fn unrecognised_internal_alert_is_a_no_op() {
        let (store, reconciler) = seeded().await;
        let before = store.hgetall("hash_p1_chainX").ok();

        let outcome = reconciler
            .apply(&control(5001, GITHUB_ALERTER_MANAGER, "chainX"))
            .await;

        assert_eq!(outcome.ok(), Some(Reconciliation::Ignored));
        assert_eq!(store.hgetall("hash_p1_chainX").ok(), before);
    }
}
