use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    sync::{Arc, Mutex, MutexGuard},
};

use alert_store_common::{AlertDocument, AlertSummary};

use crate::api::{DocumentStore, KeyValueStore};
use crate::error::StoreError;

#[derive(Default, Clone, Debug)]
pub struct InMemoryDocumentStore(Arc<Mutex<DocumentsInner>>);

#[derive(Default, Debug)]
struct DocumentsInner {
    /// Documents per collection, in creation order
    collections: HashMap<String, Vec<AlertDocument>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> Result<MutexGuard<'_, DocumentsInner>, StoreError> {
        self.0.lock().map_err(|_| StoreError::Lock)
    }

    /// Documents of a collection in creation order.
    pub fn documents(&self, collection: &str) -> Result<Vec<AlertDocument>, StoreError> {
        Ok(self
            .inner()?
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    pub fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.inner()?.collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn push_alert(
        &self,
        collection: &str,
        summary: AlertSummary,
        timestamp: f64,
        capacity: u32,
    ) -> Result<(), StoreError> {
        // The lock is held across find and update, keeping the step atomic.
        let mut inner = self.inner()?;
        let documents = inner
            .collections
            .entry(collection.to_owned())
            .or_default();

        match documents
            .iter_mut()
            .find(|document| document.is_open(capacity))
        {
            Some(document) => document.push(summary, timestamp),
            None => documents.push(AlertDocument::seeded(summary, timestamp)),
        }

        Ok(())
    }
}

#[derive(Default, Clone, Debug)]
pub struct InMemoryKeyValueStore(Arc<Mutex<KeyValueInner>>);

#[derive(Default, Debug)]
struct KeyValueInner {
    /// Map of hash name to its fields
    hashes: BTreeMap<String, BTreeMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> Result<MutexGuard<'_, KeyValueInner>, StoreError> {
        self.0.lock().map_err(|_| StoreError::Lock)
    }

    pub fn hget(&self, name: &str, field: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .inner()?
            .hashes
            .get(name)
            .and_then(|fields| fields.get(field))
            .cloned())
    }

    pub fn hgetall(&self, name: &str) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self.inner()?.hashes.get(name).cloned().unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn hset(&self, name: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.inner()?
            .hashes
            .entry(name.to_owned())
            .or_default()
            .insert(field.to_owned(), value.to_owned());
        Ok(())
    }

    async fn hkeys(&self, name: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .inner()?
            .hashes
            .get(name)
            .map(|fields| fields.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn hremove(&self, name: &str, fields: &[String]) -> Result<u64, StoreError> {
        let mut inner = self.inner()?;
        let Some(hash) = inner.hashes.get_mut(name) else {
            return Ok(0);
        };

        let mut removed = 0;
        for field in fields {
            if hash.remove(field).is_some() {
                removed += 1;
            }
        }
        // Redis drops a hash once its last field is gone
        if hash.is_empty() {
            inner.hashes.remove(name);
        }

        Ok(removed)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .inner()?
            .hashes
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(ts: u32) -> AlertSummary {
        AlertSummary {
            origin: "nodeA".to_owned(),
            alert_name: "MissedBlocks".to_owned(),
            severity: "WARNING".to_owned(),
            message: format!("alert {ts}"),
            metric: "missed_blocks".to_owned(),
            timestamp: format!("{ts}.0"),
        }
    }

    #[tokio::test]
    async fn rolls_over_to_a_new_document_at_capacity() {
        let store = InMemoryDocumentStore::new();
        for ts in 1..=7 {
            let pushed = store
                .push_alert("chainX", summary(ts), f64::from(ts), 3)
                .await;
            assert!(pushed.is_ok());
        }

        let documents = store.documents("chainX");
        assert!(documents.is_ok());
        let Ok(documents) = documents else {
            return;
        };
        let counts: Vec<u32> = documents.iter().map(|doc| doc.n_alerts).collect();
        assert_eq!(counts, vec![3, 3, 1]);
        assert_eq!(documents[1].first, 4.0);
        assert_eq!(documents[1].last, 6.0);
        assert_eq!(documents[2].first, 7.0);
        assert_eq!(documents[2].last, 7.0);
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let store = InMemoryDocumentStore::new();
        assert!(store.push_alert("chainX", summary(1), 1.0, 3).await.is_ok());
        assert!(store.push_alert("chainY", summary(2), 2.0, 3).await.is_ok());

        assert_eq!(
            store.collection_names().ok(),
            Some(vec!["chainX".to_owned(), "chainY".to_owned()])
        );
        assert_eq!(store.documents("chainX").map(|d| d.len()).ok(), Some(1));
    }

    #[tokio::test]
    async fn hremove_reports_only_existing_fields() {
        let store = InMemoryKeyValueStore::new();
        assert!(store.hset("hash_p1_chainX", "a", "1").await.is_ok());
        assert!(store.hset("hash_p1_chainX", "b", "2").await.is_ok());

        let removed = store
            .hremove("hash_p1_chainX", &["a".to_owned(), "missing".to_owned()])
            .await;
        assert_eq!(removed.ok(), Some(1));
        assert_eq!(
            store.hkeys("hash_p1_chainX").await.ok(),
            Some(vec!["b".to_owned()])
        );
    }

    #[tokio::test]
    async fn prefix_scan_only_returns_matching_hashes() {
        let store = InMemoryKeyValueStore::new();
        assert!(store.hset("hash_p1_chainX", "a", "1").await.is_ok());
        assert!(store.hset("hash_p1_chainY", "a", "1").await.is_ok());
        assert!(store.hset("other", "a", "1").await.is_ok());

        assert_eq!(
            store.keys_with_prefix("hash_p1").await.ok(),
            Some(vec!["hash_p1_chainX".to_owned(), "hash_p1_chainY".to_owned()])
        );
    }
}
