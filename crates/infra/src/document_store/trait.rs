use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use recordkeep_core::DocumentId;
use recordkeep_events::{DocumentSnapshot, Fields};

/// How `set()` treats fields already stored at the target document.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SetOptions {
    /// Replace the whole document.
    #[default]
    Overwrite,
    /// Merge the given fields into the existing document (creating it if absent).
    Merge,
}

/// Document state around a single write.
///
/// `before` is `None` when the write created the document, `after` is `None`
/// when it deleted it (or when deleting a document that did not exist).
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub id: DocumentId,
    pub before: Option<DocumentSnapshot>,
    pub after: Option<DocumentSnapshot>,
}

/// Document store operation error.
///
/// These are **infrastructure errors**; repositories wrap them with the
/// collection and operation they were performing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no document at {collection}/{id}")]
    NotFound { collection: String, id: DocumentId },

    #[error("field '{field}' of {collection}/{id} is not an integer")]
    NotAnInteger {
        collection: String,
        id: DocumentId,
        field: String,
    },

    #[error("invalid document data: {0}")]
    InvalidData(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Collection-addressed JSON document store.
///
/// ## Semantics
///
/// - `add()` assigns a fresh opaque id.
/// - `set()` overwrites or merges; it creates missing documents.
/// - `update()` merges into an **existing** document and fails with
///   `StoreError::NotFound` otherwise.
/// - `increment()` is an atomic field-level add (merge-write): concurrent calls
///   on the same field each observe a distinct resulting value. A missing
///   document or field counts as `0`.
/// - `delete()` is idempotent.
///
/// Every write reports the before/after state so the change feed can be
/// derived without re-reading.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn add(&self, collection: &str, data: Fields) -> Result<WriteOutcome, StoreError>;

    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<DocumentSnapshot>, StoreError>;

    /// All documents of a collection, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<DocumentSnapshot>, StoreError>;

    async fn set(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Fields,
        options: SetOptions,
    ) -> Result<WriteOutcome, StoreError>;

    async fn update(&self, collection: &str, id: &DocumentId, data: Fields) -> Result<WriteOutcome, StoreError>;

    async fn increment(
        &self,
        collection: &str,
        id: &DocumentId,
        field: &str,
        delta: i64,
    ) -> Result<WriteOutcome, StoreError>;

    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<WriteOutcome, StoreError>;
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn add(&self, collection: &str, data: Fields) -> Result<WriteOutcome, StoreError> {
        (**self).add(collection, data).await
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<DocumentSnapshot>, StoreError> {
        (**self).get(collection, id).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<DocumentSnapshot>, StoreError> {
        (**self).list(collection).await
    }

    async fn set(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Fields,
        options: SetOptions,
    ) -> Result<WriteOutcome, StoreError> {
        (**self).set(collection, id, data, options).await
    }

    async fn update(&self, collection: &str, id: &DocumentId, data: Fields) -> Result<WriteOutcome, StoreError> {
        (**self).update(collection, id, data).await
    }

    async fn increment(
        &self,
        collection: &str,
        id: &DocumentId,
        field: &str,
        delta: i64,
    ) -> Result<WriteOutcome, StoreError> {
        (**self).increment(collection, id, field, delta).await
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<WriteOutcome, StoreError> {
        (**self).delete(collection, id).await
    }
}

/// Deep-merge `patch` into `target`: nested objects merge, everything else replaces.
pub fn merge_fields(target: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        match (target.get_mut(&key), value) {
            (Some(JsonValue::Object(existing)), JsonValue::Object(incoming)) => {
                merge_fields(existing, incoming);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

/// Apply an integer increment to a field map, returning the new value.
pub fn increment_field(
    fields: &mut Fields,
    collection: &str,
    id: &DocumentId,
    field: &str,
    delta: i64,
) -> Result<i64, StoreError> {
    let current = match fields.get(field) {
        None | Some(JsonValue::Null) => 0,
        Some(value) => value.as_i64().ok_or_else(|| StoreError::NotAnInteger {
            collection: collection.to_string(),
            id: id.clone(),
            field: field.to_string(),
        })?,
    };

    let next = current
        .checked_add(delta)
        .ok_or_else(|| StoreError::InvalidData(format!("increment of '{field}' overflows")))?;
    fields.insert(field.to_string(), JsonValue::from(next));
    Ok(next)
}
