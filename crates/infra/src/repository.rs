//! Generic typed repository over a document collection.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use recordkeep_core::{Document, DocumentId};
use recordkeep_events::{DocumentSnapshot, Fields};

use crate::document_store::{DocumentStore, SetOptions, StoreError, is_reserved_id};

/// Repository operation, as it appears in error messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    Creating,
    Getting,
    Updating,
    Deleting,
    Listing,
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Operation::Creating => "creating",
            Operation::Getting => "getting",
            Operation::Updating => "updating",
            Operation::Deleting => "deleting",
            Operation::Listing => "listing",
        })
    }
}

#[derive(Debug, Error)]
pub enum RepositoryFailure {
    #[error("Record not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid document payload: {0}")]
    Encode(String),

    #[error("malformed stored document: {0}")]
    Decode(String),
}

/// Failure of a repository operation, tagged with collection and operation.
///
/// Renders as `<collection> Repository Error: <operation> record: <cause>`.
#[derive(Debug, Error)]
#[error("{collection} Repository Error: {operation} record: {source}")]
pub struct RepositoryError {
    collection: String,
    operation: Operation,
    #[source]
    source: RepositoryFailure,
}

impl RepositoryError {
    pub fn new(collection: impl Into<String>, operation: Operation, source: RepositoryFailure) -> Self {
        Self {
            collection: collection.into(),
            operation,
            source,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn failure(&self) -> &RepositoryFailure {
        &self.source
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.source,
            RepositoryFailure::NotFound | RepositoryFailure::Store(StoreError::NotFound { .. })
        )
    }
}

/// CRUD over one collection of typed documents.
#[async_trait]
pub trait BaseRepository<T: Document>: Send + Sync {
    /// Persist a new document under a fresh id and return it as stored.
    async fn create(&self, item: T::Patch) -> Result<T, RepositoryError>;

    async fn get(&self, id: &DocumentId) -> Result<T, RepositoryError>;

    /// Merge `item` into an existing document and return `{ id, ...item }`.
    async fn update(&self, id: &DocumentId, item: T::Patch) -> Result<T, RepositoryError>;

    async fn delete(&self, id: &DocumentId) -> Result<(), RepositoryError>;

    /// Every user document of the collection (bookkeeping documents excluded).
    async fn list(&self) -> Result<Vec<T>, RepositoryError>;
}

/// `BaseRepository` backed by a `DocumentStore` collection.
pub struct DocumentRepository<T> {
    store: Arc<dyn DocumentStore>,
    collection: String,
    _document: PhantomData<fn() -> T>,
}

impl<T> Clone for DocumentRepository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            collection: self.collection.clone(),
            _document: PhantomData,
        }
    }
}

impl<T> core::fmt::Debug for DocumentRepository<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DocumentRepository")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl<T: Document> DocumentRepository<T> {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            _document: PhantomData,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn err(&self, operation: Operation, failure: impl Into<RepositoryFailure>) -> RepositoryError {
        RepositoryError::new(self.collection.clone(), operation, failure.into())
    }

    fn encode(&self, operation: Operation, item: &T::Patch) -> Result<Fields, RepositoryError> {
        match serde_json::to_value(item) {
            Ok(JsonValue::Object(mut fields)) => {
                fields.remove("id");
                Ok(fields)
            }
            Ok(other) => Err(self.err(
                operation,
                RepositoryFailure::Encode(format!("expected an object, got {other}")),
            )),
            Err(e) => Err(self.err(operation, RepositoryFailure::Encode(e.to_string()))),
        }
    }

    fn decode(&self, operation: Operation, snapshot: &DocumentSnapshot) -> Result<T, RepositoryError> {
        serde_json::from_value(snapshot.to_json_with_id())
            .map_err(|e| self.err(operation, RepositoryFailure::Decode(e.to_string())))
    }
}

#[async_trait]
impl<T: Document> BaseRepository<T> for DocumentRepository<T> {
    async fn create(&self, item: T::Patch) -> Result<T, RepositoryError> {
        let op = Operation::Creating;
        let fields = self.encode(op, &item)?;

        let written = self
            .store
            .add(&self.collection, fields)
            .await
            .map_err(|e| self.err(op, e))?;

        // Read back what was stored rather than echoing the input.
        let snapshot = self
            .store
            .get(&self.collection, &written.id)
            .await
            .map_err(|e| self.err(op, e))?
            .ok_or_else(|| self.err(op, RepositoryFailure::NotFound))?;

        self.decode(op, &snapshot)
    }

    async fn get(&self, id: &DocumentId) -> Result<T, RepositoryError> {
        let op = Operation::Getting;
        let snapshot = self
            .store
            .get(&self.collection, id)
            .await
            .map_err(|e| self.err(op, e))?
            .ok_or_else(|| self.err(op, RepositoryFailure::NotFound))?;

        self.decode(op, &snapshot)
    }

    async fn update(&self, id: &DocumentId, item: T::Patch) -> Result<T, RepositoryError> {
        let op = Operation::Updating;
        let fields = self.encode(op, &item)?;

        self.store
            .set(&self.collection, id, fields, SetOptions::Merge)
            .await
            .map_err(|e| self.err(op, e))?;

        Ok(T::from_patch(id.clone(), item))
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), RepositoryError> {
        self.store
            .delete(&self.collection, id)
            .await
            .map_err(|e| self.err(Operation::Deleting, e))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<T>, RepositoryError> {
        let op = Operation::Listing;
        let snapshots = self
            .store
            .list(&self.collection)
            .await
            .map_err(|e| self.err(op, e))?;

        snapshots
            .iter()
            .filter(|s| !is_reserved_id(s.id()))
            .map(|s| self.decode(op, s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::document_store::{COUNTER_DOCUMENT_ID, InMemoryDocumentStore};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: DocumentId,
        title: String,
        #[serde(default)]
        pinned: Option<bool>,
    }

    #[derive(Debug, Clone, Serialize)]
    struct NotePatch {
        title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pinned: Option<bool>,
    }

    impl Document for Note {
        type Patch = NotePatch;

        fn id(&self) -> &DocumentId {
            &self.id
        }

        fn from_patch(id: DocumentId, patch: NotePatch) -> Self {
            Self {
                id,
                title: patch.title,
                pinned: patch.pinned,
            }
        }
    }

    fn repo() -> (Arc<InMemoryDocumentStore>, DocumentRepository<Note>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = DocumentRepository::new(store.clone() as Arc<dyn DocumentStore>, "notes");
        (store, repo)
    }

    fn patch(title: &str) -> NotePatch {
        NotePatch {
            title: title.to_string(),
            pinned: None,
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_stored_document() {
        let (_, repo) = repo();

        let created = repo.create(patch("first")).await.unwrap();
        assert_eq!(created.title, "first");

        let fetched = repo.get(created.id()).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn get_missing_document_reports_not_found() {
        let (_, repo) = repo();

        let err = repo.get(&DocumentId::new("nope").unwrap()).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.operation(), Operation::Getting);
        assert_eq!(err.to_string(), "notes Repository Error: getting record: Record not found");
    }

    #[tokio::test]
    async fn update_merges_and_echoes_patch() {
        let (store, repo) = repo();
        let created = repo.create(patch("first")).await.unwrap();

        let echoed = repo
            .update(
                created.id(),
                NotePatch {
                    title: "second".to_string(),
                    pinned: Some(true),
                },
            )
            .await
            .unwrap();
        assert_eq!(echoed.title, "second");
        assert_eq!(echoed.pinned, Some(true));

        let stored = store.get("notes", created.id()).await.unwrap().unwrap();
        assert_eq!(stored.get("pinned"), Some(&serde_json::json!(true)));
    }

    #[tokio::test]
    async fn list_skips_counter_document_and_delete_removes() {
        let (store, repo) = repo();
        let a = repo.create(patch("a")).await.unwrap();
        repo.create(patch("b")).await.unwrap();
        store
            .increment("notes", &DocumentId::new(COUNTER_DOCUMENT_ID).unwrap(), "currentId", 1)
            .await
            .unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 2);

        repo.delete(a.id()).await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.get(a.id()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn malformed_document_is_a_decode_failure() {
        let (store, repo) = repo();
        let mut fields = Fields::new();
        fields.insert("title".to_string(), serde_json::json!(42));
        let id = store.add("notes", fields).await.unwrap().id;

        let err = repo.get(&id).await.unwrap_err();
        assert!(matches!(err.failure(), RepositoryFailure::Decode(_)));
        assert!(!err.is_not_found());
    }
}
