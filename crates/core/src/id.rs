//! Document identifiers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque identifier of a document inside a collection.
///
/// Ids are assigned by the document store on creation. Reserved ids (such as
/// a collection's counter document) share the same namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidDocumentId {
    #[error("document id must not be empty")]
    Empty,

    #[error("document id must not contain '/': {0}")]
    ContainsSlash(String),
}

impl DocumentId {
    /// Generate a fresh store-assigned identifier.
    ///
    /// Uses UUIDv7 (time-ordered) rendered without hyphens.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn new(value: impl Into<String>) -> Result<Self, InvalidDocumentId> {
        let value = value.into();
        if value.is_empty() {
            return Err(InvalidDocumentId::Empty);
        }
        if value.contains('/') {
            return Err(InvalidDocumentId::ContainsSlash(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = InvalidDocumentId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
