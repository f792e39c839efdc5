use crate::change::DocumentChange;

/// Name of the wildcard segment used by collection-scoped triggers.
pub const DOC_ID_PARAM: &str = "docId";

/// Document path pattern of the form `<collection>/{<param>}`.
///
/// Only single-level collections are addressed; the wildcard matches any
/// document id in the collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPattern {
    collection: String,
    param: String,
}

impl DocumentPattern {
    /// Pattern matching every document of `collection` (`<collection>/{docId}`).
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            param: DOC_ID_PARAM.to_string(),
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn matches(&self, change: &DocumentChange) -> bool {
        change.collection() == self.collection
    }
}

impl core::fmt::Display for DocumentPattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{{{}}}", self.collection, self.param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{DocumentSnapshot, Fields};
    use chrono::Utc;
    use recordkeep_core::DocumentId;

    fn created_in(collection: &str) -> DocumentChange {
        let id = DocumentId::generate();
        let after = DocumentSnapshot::new(collection, id.clone(), Fields::new(), Utc::now());
        DocumentChange::between(collection, id, None, Some(after)).unwrap()
    }

    #[test]
    fn renders_wildcard_path() {
        assert_eq!(DocumentPattern::collection("records").to_string(), "records/{docId}");
    }

    #[test]
    fn matches_only_its_collection() {
        let pattern = DocumentPattern::collection("records");
        let change = created_in("records");

        assert!(pattern.matches(&change));
        assert!(!pattern.matches(&created_in("other")));
    }
}
