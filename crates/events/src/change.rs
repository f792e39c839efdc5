use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use recordkeep_core::DocumentId;

/// Field map of a stored document.
pub type Fields = Map<String, JsonValue>;

/// Point-in-time view of an existing document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    collection: String,
    id: DocumentId,
    data: Fields,
    update_time: DateTime<Utc>,
}

impl DocumentSnapshot {
    pub fn new(
        collection: impl Into<String>,
        id: DocumentId,
        data: Fields,
        update_time: DateTime<Utc>,
    ) -> Self {
        Self {
            collection: collection.into(),
            id,
            data,
            update_time,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// `<collection>/<id>`
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }

    pub fn data(&self) -> &Fields {
        &self.data
    }

    pub fn into_data(self) -> Fields {
        self.data
    }

    /// Look up a single top-level field.
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.data.get(field)
    }

    pub fn update_time(&self) -> DateTime<Utc> {
        self.update_time
    }

    /// Document fields with the id merged in as `"id"`.
    pub fn to_json_with_id(&self) -> JsonValue {
        let mut fields = self.data.clone();
        fields.insert("id".to_string(), JsonValue::String(self.id.to_string()));
        JsonValue::Object(fields)
    }
}

/// Before/after pair delivered to update and write triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change<T> {
    pub before: T,
    pub after: T,
}

/// What happened to a document.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// One entry of the store's change feed.
///
/// Emitted after every successful write. `before` is absent for creations and
/// `after` is absent for deletions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChange {
    event_id: Uuid,
    kind: ChangeKind,
    collection: String,
    document_id: DocumentId,
    before: Option<DocumentSnapshot>,
    after: Option<DocumentSnapshot>,
}

impl DocumentChange {
    /// Derive a change from the document state around a write.
    ///
    /// Returns `None` when nothing existed before or after (e.g. deleting a
    /// missing document).
    pub fn between(
        collection: impl Into<String>,
        document_id: DocumentId,
        before: Option<DocumentSnapshot>,
        after: Option<DocumentSnapshot>,
    ) -> Option<Self> {
        let kind = match (&before, &after) {
            (None, Some(_)) => ChangeKind::Created,
            (Some(_), Some(_)) => ChangeKind::Updated,
            (Some(_), None) => ChangeKind::Deleted,
            (None, None) => return None,
        };

        Some(Self {
            event_id: Uuid::now_v7(),
            kind,
            collection: collection.into(),
            document_id,
            before,
            after,
        })
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn before(&self) -> Option<&DocumentSnapshot> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&DocumentSnapshot> {
        self.after.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &DocumentId, name: &str) -> DocumentSnapshot {
        let mut data = Fields::new();
        data.insert("name".to_string(), JsonValue::from(name));
        DocumentSnapshot::new("records", id.clone(), data, Utc::now())
    }

    #[test]
    fn change_kind_follows_presence_of_states() {
        let id = DocumentId::generate();

        let created = DocumentChange::between("records", id.clone(), None, Some(snapshot(&id, "a"))).unwrap();
        assert_eq!(created.kind(), ChangeKind::Created);

        let updated = DocumentChange::between(
            "records",
            id.clone(),
            Some(snapshot(&id, "a")),
            Some(snapshot(&id, "b")),
        )
        .unwrap();
        assert_eq!(updated.kind(), ChangeKind::Updated);

        let deleted = DocumentChange::between("records", id.clone(), Some(snapshot(&id, "b")), None).unwrap();
        assert_eq!(deleted.kind(), ChangeKind::Deleted);

        assert!(DocumentChange::between("records", id, None, None).is_none());
    }

    #[test]
    fn each_change_gets_its_own_event_id() {
        let id = DocumentId::generate();
        let first = DocumentChange::between("records", id.clone(), None, Some(snapshot(&id, "a"))).unwrap();
        let second = DocumentChange::between("records", id.clone(), None, Some(snapshot(&id, "a"))).unwrap();

        assert_ne!(first.event_id(), second.event_id());
    }

    #[test]
    fn snapshot_json_includes_id() {
        let id = DocumentId::generate();
        let json = snapshot(&id, "a").to_json_with_id();
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["name"], "a");
    }
}
