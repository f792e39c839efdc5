//! Sequential id assignment for newly created documents.
//!
//! Each collection keeps a reserved `counter` document whose `currentId` is
//! atomically incremented once per created document; the resulting value is
//! stamped onto the new document as `increment_id`.

use std::sync::Arc;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, error, info};

use recordkeep_core::DocumentId;
use recordkeep_events::{DocumentSnapshot, Fields};
use recordkeep_infra::{COUNTER_DOCUMENT_ID, DocumentStore, is_reserved_id};

use crate::trigger::{DocumentTrigger, TriggerHandler};

/// Counter field on the `counter` document.
pub const COUNTER_FIELD: &str = "currentId";

/// Field written onto the created document.
pub const INCREMENT_ID_FIELD: &str = "increment_id";

/// What happens when assigning an id fails after the event was accepted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log and report success; the document keeps no `increment_id`.
    #[default]
    Swallow,
    /// Return the error so the runner redelivers the event.
    Propagate,
}

impl core::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "swallow" => Ok(FailurePolicy::Swallow),
            "propagate" => Ok(FailurePolicy::Propagate),
            other => Err(format!("unknown failure policy '{other}' (expected swallow|propagate)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SetIncrementIdHandler {
    collection: String,
    policy: FailurePolicy,
}

impl SetIncrementIdHandler {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn assign(&self, store: &dyn DocumentStore, created: &DocumentSnapshot) -> anyhow::Result<i64> {
        let counter = DocumentId::new(COUNTER_DOCUMENT_ID)?;

        // Take the value from the increment itself; a re-read may see another delivery's increment.
        let outcome = store
            .increment(&self.collection, &counter, COUNTER_FIELD, 1)
            .await
            .context("incrementing counter")?;

        let next = outcome
            .after
            .as_ref()
            .and_then(|doc| doc.get(COUNTER_FIELD).and_then(JsonValue::as_i64))
            .ok_or_else(|| anyhow!("failed to retrieve new increment id"))?;

        let mut fields = Fields::new();
        fields.insert(INCREMENT_ID_FIELD.to_string(), JsonValue::from(next));
        store
            .update(created.collection(), created.id(), fields)
            .await
            .context("stamping created document")?;

        Ok(next)
    }
}

#[async_trait]
impl TriggerHandler<DocumentSnapshot> for SetIncrementIdHandler {
    async fn handle(&self, store: Arc<dyn DocumentStore>, data: Option<DocumentSnapshot>) -> anyhow::Result<()> {
        let Some(created) = data else {
            error!(collection = %self.collection, "no event data provided");
            return Ok(());
        };

        if is_reserved_id(created.id()) {
            debug!(collection = %self.collection, document_id = %created.id(), "skipping reserved document");
            return Ok(());
        }

        match self.assign(store.as_ref(), &created).await {
            Ok(increment_id) => {
                info!(
                    collection = %self.collection,
                    document_id = %created.id(),
                    increment_id,
                    "new increment id"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    collection = %self.collection,
                    document_id = %created.id(),
                    error = ?err,
                    "error incrementing id"
                );
                match self.policy {
                    FailurePolicy::Swallow => Ok(()),
                    FailurePolicy::Propagate => Err(err),
                }
            }
        }
    }
}

/// `on_created` trigger on `<collection>/{docId}` running `SetIncrementIdHandler`.
pub fn set_increment_id_trigger(
    collection: &str,
    store: Arc<dyn DocumentStore>,
    policy: FailurePolicy,
) -> DocumentTrigger {
    DocumentTrigger::on_created(
        collection,
        SetIncrementIdHandler::new(collection).with_policy(policy),
        store,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use recordkeep_events::DocumentChange;
    use recordkeep_infra::{InMemoryDocumentStore, SetOptions, StoreError, WriteOutcome};

    use super::*;

    /// Counts writes and can be told to misbehave.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryDocumentStore,
        writes: AtomicUsize,
        fail_updates: bool,
        /// Yield to other tasks after each committed increment.
        yield_after_increment: bool,
        /// Report increments without the counter value.
        hide_increment_value: bool,
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn add(&self, collection: &str, data: Fields) -> Result<WriteOutcome, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.add(collection, data).await
        }

        async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<DocumentSnapshot>, StoreError> {
            self.inner.get(collection, id).await
        }

        async fn list(&self, collection: &str) -> Result<Vec<DocumentSnapshot>, StoreError> {
            self.inner.list(collection).await
        }

        async fn set(
            &self,
            collection: &str,
            id: &DocumentId,
            data: Fields,
            options: SetOptions,
        ) -> Result<WriteOutcome, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(collection, id, data, options).await
        }

        async fn update(&self, collection: &str, id: &DocumentId, data: Fields) -> Result<WriteOutcome, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_updates {
                return Err(StoreError::Backend("update rejected".to_string()));
            }
            self.inner.update(collection, id, data).await
        }

        async fn increment(
            &self,
            collection: &str,
            id: &DocumentId,
            field: &str,
            delta: i64,
        ) -> Result<WriteOutcome, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut outcome = self.inner.increment(collection, id, field, delta).await?;
            if self.yield_after_increment {
                tokio::task::yield_now().await;
            }
            if self.hide_increment_value {
                outcome.after = outcome.after.map(|doc| {
                    let mut data = doc.data().clone();
                    data.remove(field);
                    DocumentSnapshot::new(doc.collection(), doc.id().clone(), data, doc.update_time())
                });
            }
            Ok(outcome)
        }

        async fn delete(&self, collection: &str, id: &DocumentId) -> Result<WriteOutcome, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(collection, id).await
        }
    }

    async fn create(store: &dyn DocumentStore, name: &str) -> DocumentChange {
        let mut fields = Fields::new();
        fields.insert("name".to_string(), JsonValue::from(name));
        let outcome = store.add("records", fields).await.unwrap();
        DocumentChange::between("records", outcome.id, outcome.before, outcome.after).unwrap()
    }

    async fn increment_id_of(store: &dyn DocumentStore, change: &DocumentChange) -> Option<i64> {
        store
            .get("records", change.document_id())
            .await
            .unwrap()
            .and_then(|doc| doc.get(INCREMENT_ID_FIELD).and_then(JsonValue::as_i64))
    }

    #[tokio::test]
    async fn sequential_creations_get_consecutive_ids() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let trigger = set_increment_id_trigger("records", store.clone(), FailurePolicy::Swallow);

        let first = create(store.as_ref(), "a").await;
        let second = create(store.as_ref(), "b").await;
        trigger.fire(&first).await.unwrap();
        trigger.fire(&second).await.unwrap();

        assert_eq!(increment_id_of(store.as_ref(), &first).await, Some(1));
        assert_eq!(increment_id_of(store.as_ref(), &second).await, Some(2));

        let counter = store
            .get("records", &DocumentId::new(COUNTER_DOCUMENT_ID).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counter.get(COUNTER_FIELD), Some(&JsonValue::from(2)));
    }

    #[tokio::test]
    async fn absent_event_data_writes_nothing() {
        let store = Arc::new(CountingStore::default());
        let handler = SetIncrementIdHandler::new("records");

        handler.handle(store.clone(), None).await.unwrap();

        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn counter_creation_does_not_stamp_itself() {
        let store = Arc::new(CountingStore::default());
        let counter = DocumentId::new(COUNTER_DOCUMENT_ID).unwrap();
        let outcome = store.inner.increment("records", &counter, COUNTER_FIELD, 1).await.unwrap();

        let handler = SetIncrementIdHandler::new("records");
        handler.handle(store.clone(), outcome.after).await.unwrap();

        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_policy_decides_whether_errors_escape() {
        let store = Arc::new(CountingStore {
            fail_updates: true,
            ..Default::default()
        });
        let change = create(store.as_ref(), "a").await;
        let created = change.after().cloned();

        let swallowing = SetIncrementIdHandler::new("records");
        assert!(swallowing.handle(store.clone(), created.clone()).await.is_ok());

        let propagating = SetIncrementIdHandler::new("records").with_policy(FailurePolicy::Propagate);
        assert!(propagating.handle(store.clone(), created).await.is_err());

        assert_eq!(increment_id_of(store.as_ref(), &change).await, None);
    }

    #[tokio::test]
    async fn interleaved_deliveries_get_distinct_ids() {
        let store = Arc::new(CountingStore {
            yield_after_increment: true,
            ..Default::default()
        });
        let trigger = set_increment_id_trigger("records", store.clone(), FailurePolicy::Propagate);

        let a = create(store.as_ref(), "a").await;
        let b = create(store.as_ref(), "b").await;
        let (fired_a, fired_b) = tokio::join!(trigger.fire(&a), trigger.fire(&b));
        fired_a.unwrap();
        fired_b.unwrap();

        let mut ids = vec![
            increment_id_of(store.as_ref(), &a).await.unwrap(),
            increment_id_of(store.as_ref(), &b).await.unwrap(),
        ];
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_burst_never_repeats_an_id() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let trigger = set_increment_id_trigger("records", store.clone(), FailurePolicy::Propagate);

        let mut changes = Vec::new();
        for i in 0..64 {
            changes.push(create(store.as_ref(), &format!("r{i}")).await);
        }

        let mut tasks = Vec::new();
        for change in changes.clone() {
            let trigger = trigger.clone();
            tasks.push(tokio::spawn(async move { trigger.fire(&change).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut ids = Vec::new();
        for change in &changes {
            ids.push(increment_id_of(store.as_ref(), change).await.unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=64).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn ids_follow_dispatch_order_not_creation_order() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let trigger = set_increment_id_trigger("records", store.clone(), FailurePolicy::Swallow);

        let a = create(store.as_ref(), "a").await;
        let b = create(store.as_ref(), "b").await;
        trigger.fire(&b).await.unwrap();
        trigger.fire(&a).await.unwrap();

        assert_eq!(increment_id_of(store.as_ref(), &b).await, Some(1));
        assert_eq!(increment_id_of(store.as_ref(), &a).await, Some(2));
    }

    #[tokio::test]
    async fn non_integer_counter_fails_per_policy() {
        let store = Arc::new(CountingStore::default());
        let counter = DocumentId::new(COUNTER_DOCUMENT_ID).unwrap();
        let mut fields = Fields::new();
        fields.insert(COUNTER_FIELD.to_string(), JsonValue::from("one"));
        store
            .inner
            .set("records", &counter, fields, SetOptions::Overwrite)
            .await
            .unwrap();

        let change = create(store.as_ref(), "a").await;
        let created = change.after().cloned();

        let swallowing = SetIncrementIdHandler::new("records");
        assert!(swallowing.handle(store.clone(), created.clone()).await.is_ok());

        let propagating = SetIncrementIdHandler::new("records").with_policy(FailurePolicy::Propagate);
        assert!(propagating.handle(store.clone(), created).await.is_err());

        assert_eq!(increment_id_of(store.as_ref(), &change).await, None);
    }

    #[tokio::test]
    async fn missing_counter_value_fails_per_policy() {
        let store = Arc::new(CountingStore {
            hide_increment_value: true,
            ..Default::default()
        });
        let change = create(store.as_ref(), "a").await;
        let created = change.after().cloned();

        let swallowing = SetIncrementIdHandler::new("records");
        assert!(swallowing.handle(store.clone(), created.clone()).await.is_ok());

        let propagating = SetIncrementIdHandler::new("records").with_policy(FailurePolicy::Propagate);
        let err = propagating.handle(store.clone(), created).await.unwrap_err();
        assert_eq!(err.to_string(), "failed to retrieve new increment id");

        assert_eq!(increment_id_of(store.as_ref(), &change).await, None);
    }

    #[test]
    fn parses_failure_policy() {
        assert_eq!("swallow".parse::<FailurePolicy>(), Ok(FailurePolicy::Swallow));
        assert_eq!(" Propagate ".parse::<FailurePolicy>(), Ok(FailurePolicy::Propagate));
        assert!("retry".parse::<FailurePolicy>().is_err());
    }
}
