//! Document store boundary.
//!
//! Collection-addressed JSON documents with a change feed. Backends only
//! persist; `PublishingDocumentStore` turns successful writes into
//! `DocumentChange` messages for the trigger runner.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod r#trait;

use async_trait::async_trait;
use tracing::warn;

use recordkeep_core::DocumentId;
use recordkeep_events::{DocumentChange, DocumentSnapshot, EventBus, Fields};

pub use in_memory::InMemoryDocumentStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDocumentStore;
pub use r#trait::{DocumentStore, SetOptions, StoreError, WriteOutcome, increment_field, merge_fields};

/// Id of the per-collection counter document used by increment-id triggers.
pub const COUNTER_DOCUMENT_ID: &str = "counter";

/// Document ids that hold bookkeeping state rather than user data.
pub const RESERVED_DOCUMENT_IDS: &[&str] = &[COUNTER_DOCUMENT_ID];

pub fn is_reserved_id(id: &DocumentId) -> bool {
    RESERVED_DOCUMENT_IDS.contains(&id.as_str())
}

/// Adapter that publishes a `DocumentChange` after every successful write.
///
/// Publish happens only after the write succeeded. A failed publish is logged
/// and does not fail the write: the document is already stored.
pub struct PublishingDocumentStore<S, B> {
    store: S,
    bus: B,
}

impl<S, B> PublishingDocumentStore<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }
}

impl<S, B> PublishingDocumentStore<S, B>
where
    B: EventBus<DocumentChange>,
{
    fn publish(&self, collection: &str, outcome: &WriteOutcome) {
        let Some(change) = DocumentChange::between(
            collection,
            outcome.id.clone(),
            outcome.before.clone(),
            outcome.after.clone(),
        ) else {
            return;
        };

        if let Err(err) = self.bus.publish(change) {
            warn!(collection, document_id = %outcome.id, error = ?err, "failed to publish document change");
        }
    }
}

#[async_trait]
impl<S, B> DocumentStore for PublishingDocumentStore<S, B>
where
    S: DocumentStore,
    B: EventBus<DocumentChange>,
{
    async fn add(&self, collection: &str, data: Fields) -> Result<WriteOutcome, StoreError> {
        let outcome = self.store.add(collection, data).await?;
        self.publish(collection, &outcome);
        Ok(outcome)
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<DocumentSnapshot>, StoreError> {
        self.store.get(collection, id).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<DocumentSnapshot>, StoreError> {
        self.store.list(collection).await
    }

    async fn set(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Fields,
        options: SetOptions,
    ) -> Result<WriteOutcome, StoreError> {
        let outcome = self.store.set(collection, id, data, options).await?;
        self.publish(collection, &outcome);
        Ok(outcome)
    }

    async fn update(&self, collection: &str, id: &DocumentId, data: Fields) -> Result<WriteOutcome, StoreError> {
        let outcome = self.store.update(collection, id, data).await?;
        self.publish(collection, &outcome);
        Ok(outcome)
    }

    async fn increment(
        &self,
        collection: &str,
        id: &DocumentId,
        field: &str,
        delta: i64,
    ) -> Result<WriteOutcome, StoreError> {
        let outcome = self.store.increment(collection, id, field, delta).await?;
        self.publish(collection, &outcome);
        Ok(outcome)
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<WriteOutcome, StoreError> {
        let outcome = self.store.delete(collection, id).await?;
        self.publish(collection, &outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use recordkeep_events::{ChangeKind, InMemoryEventBus};

    use super::*;

    #[tokio::test]
    async fn publishes_one_change_per_effective_write() {
        let bus = Arc::new(InMemoryEventBus::<DocumentChange>::new());
        let mut feed = bus.subscribe();
        let store = PublishingDocumentStore::new(InMemoryDocumentStore::new(), bus.clone());

        let id = store.add("records", Fields::new()).await.unwrap().id;
        store.increment("records", &id, "n", 1).await.unwrap();
        store.delete("records", &id).await.unwrap();
        store.delete("records", &id).await.unwrap();

        let kinds: Vec<_> = std::iter::from_fn(|| feed.try_recv().ok()).map(|c| c.kind()).collect();
        assert_eq!(kinds, vec![ChangeKind::Created, ChangeKind::Updated, ChangeKind::Deleted]);
    }

    #[tokio::test]
    async fn failed_write_publishes_nothing() {
        let bus = Arc::new(InMemoryEventBus::<DocumentChange>::new());
        let mut feed = bus.subscribe();
        let store = PublishingDocumentStore::new(InMemoryDocumentStore::new(), bus.clone());

        let missing = DocumentId::new("missing").unwrap();
        assert!(store.update("records", &missing, Fields::new()).await.is_err());
        assert!(feed.try_recv().is_err());
    }

    #[test]
    fn counter_id_is_reserved() {
        assert!(is_reserved_id(&DocumentId::new(COUNTER_DOCUMENT_ID).unwrap()));
        assert!(!is_reserved_id(&DocumentId::generate()));
    }
}
