use std::sync::Arc;

use recordkeep_infra::{DocumentRepository, DocumentStore};

use crate::record::Record;

pub const RECORDS_COLLECTION: &str = "records";

pub type RecordRepository = DocumentRepository<Record>;

pub fn record_repository(store: Arc<dyn DocumentStore>) -> RecordRepository {
    DocumentRepository::new(store, RECORDS_COLLECTION)
}
