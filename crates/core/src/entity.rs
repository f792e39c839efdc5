//! Document trait: a record shape stored in a collection.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::id::DocumentId;

/// A typed document with identity.
///
/// Documents are persisted as JSON objects. The `id` lives in the document
/// path rather than in the stored fields, so implementations must deserialize
/// from `{ "id": ..., ...fields }` and the repository takes care of merging the
/// two.
pub trait Document: Serialize + DeserializeOwned + Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Partial field set used for creates and merges.
    ///
    /// `None` fields must be skipped when serialized so that a merge leaves the
    /// stored value untouched.
    type Patch: Serialize + Clone + core::fmt::Debug + Send + Sync + 'static;

    /// Returns the document identifier.
    fn id(&self) -> &DocumentId;

    /// Build the document as submitted from an id and a patch.
    ///
    /// Fields absent from the patch take their default; nothing is read back
    /// from the store.
    fn from_patch(id: DocumentId, patch: Self::Patch) -> Self;
}
