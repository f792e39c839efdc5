//! Document-change trigger factory.

use std::sync::Arc;

use async_trait::async_trait;

use recordkeep_events::{Change, ChangeKind, DocumentChange, DocumentPattern, DocumentSnapshot};
use recordkeep_infra::DocumentStore;

/// Which document lifecycle event a trigger listens to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TriggerEvent {
    Created,
    Updated,
    Deleted,
    /// Any of the above.
    Written,
}

impl TriggerEvent {
    pub fn accepts(self, kind: ChangeKind) -> bool {
        matches!(
            (self, kind),
            (TriggerEvent::Written, _)
                | (TriggerEvent::Created, ChangeKind::Created)
                | (TriggerEvent::Updated, ChangeKind::Updated)
                | (TriggerEvent::Deleted, ChangeKind::Deleted)
        )
    }
}

/// Trigger body. `data` is `None` when the event carried no snapshot.
///
/// Errors are returned to the runner, which redelivers the change.
#[async_trait]
pub trait TriggerHandler<D>: Send + Sync {
    async fn handle(&self, store: Arc<dyn DocumentStore>, data: Option<D>) -> anyhow::Result<()>;
}

#[derive(Clone)]
enum Dispatch {
    Created(Arc<dyn TriggerHandler<DocumentSnapshot>>),
    Updated(Arc<dyn TriggerHandler<Change<DocumentSnapshot>>>),
    Deleted(Arc<dyn TriggerHandler<DocumentSnapshot>>),
    Written(Arc<dyn TriggerHandler<Change<Option<DocumentSnapshot>>>>),
}

/// A handler bound to `<collection>/{docId}` and one lifecycle event.
#[derive(Clone)]
pub struct DocumentTrigger {
    pattern: DocumentPattern,
    dispatch: Dispatch,
    store: Arc<dyn DocumentStore>,
}

impl DocumentTrigger {
    pub fn on_created(
        collection: impl Into<String>,
        handler: impl TriggerHandler<DocumentSnapshot> + 'static,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self::bind(collection, Dispatch::Created(Arc::new(handler)), store)
    }

    pub fn on_updated(
        collection: impl Into<String>,
        handler: impl TriggerHandler<Change<DocumentSnapshot>> + 'static,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self::bind(collection, Dispatch::Updated(Arc::new(handler)), store)
    }

    pub fn on_deleted(
        collection: impl Into<String>,
        handler: impl TriggerHandler<DocumentSnapshot> + 'static,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self::bind(collection, Dispatch::Deleted(Arc::new(handler)), store)
    }

    pub fn on_written(
        collection: impl Into<String>,
        handler: impl TriggerHandler<Change<Option<DocumentSnapshot>>> + 'static,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self::bind(collection, Dispatch::Written(Arc::new(handler)), store)
    }

    fn bind(collection: impl Into<String>, dispatch: Dispatch, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            pattern: DocumentPattern::collection(collection),
            dispatch,
            store,
        }
    }

    pub fn pattern(&self) -> &DocumentPattern {
        &self.pattern
    }

    pub fn event(&self) -> TriggerEvent {
        match self.dispatch {
            Dispatch::Created(_) => TriggerEvent::Created,
            Dispatch::Updated(_) => TriggerEvent::Updated,
            Dispatch::Deleted(_) => TriggerEvent::Deleted,
            Dispatch::Written(_) => TriggerEvent::Written,
        }
    }

    pub fn matches(&self, change: &DocumentChange) -> bool {
        self.pattern.matches(change) && self.event().accepts(change.kind())
    }

    /// Deliver a change to the handler. Non-matching changes are ignored.
    pub async fn fire(&self, change: &DocumentChange) -> anyhow::Result<()> {
        if !self.matches(change) {
            return Ok(());
        }

        let store = self.store.clone();
        match &self.dispatch {
            Dispatch::Created(handler) => handler.handle(store, change.after().cloned()).await,
            Dispatch::Deleted(handler) => handler.handle(store, change.before().cloned()).await,
            Dispatch::Updated(handler) => {
                let data = match (change.before(), change.after()) {
                    (Some(before), Some(after)) => Some(Change {
                        before: before.clone(),
                        after: after.clone(),
                    }),
                    _ => None,
                };
                handler.handle(store, data).await
            }
            Dispatch::Written(handler) => {
                let data = Change {
                    before: change.before().cloned(),
                    after: change.after().cloned(),
                };
                handler.handle(store, Some(data)).await
            }
        }
    }
}

impl core::fmt::Debug for DocumentTrigger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DocumentTrigger")
            .field("pattern", &self.pattern.to_string())
            .field("event", &self.event())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use recordkeep_core::DocumentId;
    use recordkeep_events::Fields;
    use recordkeep_infra::InMemoryDocumentStore;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl TriggerHandler<DocumentSnapshot> for Arc<Recorder> {
        async fn handle(&self, _store: Arc<dyn DocumentStore>, data: Option<DocumentSnapshot>) -> anyhow::Result<()> {
            self.seen
                .lock()
                .unwrap()
                .push(data.map(|snapshot| snapshot.id().to_string()));
            Ok(())
        }
    }

    struct WrittenRecorder(Arc<Mutex<Vec<(bool, bool)>>>);

    #[async_trait]
    impl TriggerHandler<Change<Option<DocumentSnapshot>>> for WrittenRecorder {
        async fn handle(
            &self,
            _store: Arc<dyn DocumentStore>,
            data: Option<Change<Option<DocumentSnapshot>>>,
        ) -> anyhow::Result<()> {
            let change = data.ok_or_else(|| anyhow::anyhow!("written change without data"))?;
            self.0
                .lock()
                .unwrap()
                .push((change.before.is_some(), change.after.is_some()));
            Ok(())
        }
    }

    fn snapshot(collection: &str, id: &DocumentId) -> DocumentSnapshot {
        DocumentSnapshot::new(collection, id.clone(), Fields::new(), Utc::now())
    }

    fn store() -> Arc<dyn DocumentStore> {
        Arc::new(InMemoryDocumentStore::new())
    }

    #[tokio::test]
    async fn created_trigger_ignores_other_kinds_and_collections() {
        let recorder = Arc::new(Recorder::default());
        let trigger = DocumentTrigger::on_created("records", recorder.clone(), store());
        let id = DocumentId::generate();

        let created = DocumentChange::between("records", id.clone(), None, Some(snapshot("records", &id))).unwrap();
        let updated = DocumentChange::between(
            "records",
            id.clone(),
            Some(snapshot("records", &id)),
            Some(snapshot("records", &id)),
        )
        .unwrap();
        let elsewhere = DocumentChange::between("other", id.clone(), None, Some(snapshot("other", &id))).unwrap();

        assert!(trigger.matches(&created));
        assert!(!trigger.matches(&updated));
        assert!(!trigger.matches(&elsewhere));

        for change in [&created, &updated, &elsewhere] {
            trigger.fire(change).await.unwrap();
        }
        assert_eq!(*recorder.seen.lock().unwrap(), vec![Some(id.to_string())]);
    }

    #[tokio::test]
    async fn written_trigger_sees_every_kind() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let trigger = DocumentTrigger::on_written("records", WrittenRecorder(seen.clone()), store());
        let id = DocumentId::generate();

        let changes = [
            DocumentChange::between("records", id.clone(), None, Some(snapshot("records", &id))),
            DocumentChange::between(
                "records",
                id.clone(),
                Some(snapshot("records", &id)),
                Some(snapshot("records", &id)),
            ),
            DocumentChange::between("records", id.clone(), Some(snapshot("records", &id)), None),
        ];
        for change in changes.iter().flatten() {
            trigger.fire(change).await.unwrap();
        }

        assert_eq!(*seen.lock().unwrap(), vec![(false, true), (true, true), (true, false)]);
    }

    #[test]
    fn event_acceptance_table() {
        assert!(TriggerEvent::Deleted.accepts(ChangeKind::Deleted));
        assert!(!TriggerEvent::Deleted.accepts(ChangeKind::Created));
        assert!(TriggerEvent::Written.accepts(ChangeKind::Updated));
    }
}
