use serde::{Deserialize, Serialize};

use recordkeep_core::{Document, DocumentId};

/// A stored record.
///
/// `increment_id` is absent until the on-create trigger has stamped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: DocumentId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment_id: Option<i64>,
}

/// Fields a caller may write. Unset fields are left untouched on merge.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub increment_id: Option<i64>,
}

impl RecordPatch {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            increment_id: None,
        }
    }
}

impl Document for Record {
    type Patch = RecordPatch;

    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn from_patch(id: DocumentId, patch: RecordPatch) -> Self {
        Self {
            id,
            name: patch.name.unwrap_or_default(),
            increment_id: patch.increment_id,
        }
    }
}
