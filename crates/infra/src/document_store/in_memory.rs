use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use recordkeep_core::DocumentId;
use recordkeep_events::{DocumentSnapshot, Fields};

use super::r#trait::{
    DocumentStore, SetOptions, StoreError, WriteOutcome, increment_field, merge_fields,
};

type Collection = BTreeMap<DocumentId, DocumentSnapshot>;

/// In-memory document store.
///
/// Intended for tests/dev. Every write holds the lock for its whole
/// read-modify-write, which makes `increment()` atomic.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_with<F>(&self, collection: &str, id: &DocumentId, apply: F) -> Result<WriteOutcome, StoreError>
    where
        F: FnOnce(Option<&DocumentSnapshot>) -> Result<Option<Fields>, StoreError>,
    {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        let docs = collections.entry(collection.to_string()).or_default();
        let before = docs.get(id).cloned();

        let after = match apply(before.as_ref())? {
            Some(data) => {
                let snapshot = DocumentSnapshot::new(collection, id.clone(), data, Utc::now());
                docs.insert(id.clone(), snapshot.clone());
                Some(snapshot)
            }
            None => {
                docs.remove(id);
                None
            }
        };

        Ok(WriteOutcome {
            id: id.clone(),
            before,
            after,
        })
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn add(&self, collection: &str, data: Fields) -> Result<WriteOutcome, StoreError> {
        let id = DocumentId::generate();
        self.write_with(collection, &id, |_| Ok(Some(data)))
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<DocumentSnapshot>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<DocumentSnapshot>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn set(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Fields,
        options: SetOptions,
    ) -> Result<WriteOutcome, StoreError> {
        self.write_with(collection, id, |existing| {
            let next = match (options, existing) {
                (SetOptions::Merge, Some(existing)) => {
                    let mut merged = existing.data().clone();
                    merge_fields(&mut merged, data);
                    merged
                }
                _ => data,
            };
            Ok(Some(next))
        })
    }

    async fn update(&self, collection: &str, id: &DocumentId, data: Fields) -> Result<WriteOutcome, StoreError> {
        self.write_with(collection, id, |existing| {
            let existing = existing.ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.clone(),
            })?;
            let mut merged = existing.data().clone();
            merge_fields(&mut merged, data);
            Ok(Some(merged))
        })
    }

    async fn increment(
        &self,
        collection: &str,
        id: &DocumentId,
        field: &str,
        delta: i64,
    ) -> Result<WriteOutcome, StoreError> {
        self.write_with(collection, id, |existing| {
            let mut data = existing.map(|s| s.data().clone()).unwrap_or_default();
            increment_field(&mut data, collection, id, field, delta)?;
            Ok(Some(data))
        })
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<WriteOutcome, StoreError> {
        self.write_with(collection, id, |_| Ok(None))
    }
}
