//! Infrastructure layer: document stores, the change-feed publishing adapter,
//! the generic repository and retry policy.

pub mod document_store;
pub mod repository;
pub mod retry;

pub use document_store::{
    COUNTER_DOCUMENT_ID, DocumentStore, InMemoryDocumentStore, PublishingDocumentStore, RESERVED_DOCUMENT_IDS,
    SetOptions, StoreError, WriteOutcome, is_reserved_id,
};
#[cfg(feature = "postgres")]
pub use document_store::PostgresDocumentStore;
pub use repository::{BaseRepository, DocumentRepository, Operation, RepositoryError, RepositoryFailure};
pub use retry::{BackoffStrategy, RetryPolicy};
