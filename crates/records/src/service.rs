use std::sync::Arc;

use tracing::error;

use recordkeep_core::{AppError, AppResult};
use recordkeep_infra::{BaseRepository, RepositoryError};

use crate::assemblers::{CreateRecordRequest, GetRecordRequest};
use crate::record::Record;

/// Record use cases over a repository.
///
/// Repository failures are logged with their full context and surface to
/// callers as catalog errors only (`Internal`, or `NotFound` for lookups).
#[derive(Clone)]
pub struct RecordService {
    repository: Arc<dyn BaseRepository<Record>>,
}

impl RecordService {
    pub fn new(repository: Arc<dyn BaseRepository<Record>>) -> Self {
        Self { repository }
    }

    pub async fn create_record(&self, request: CreateRecordRequest) -> AppResult<Record> {
        self.repository
            .create(request.into())
            .await
            .map_err(|err| internal("creating record", &err))
    }

    pub async fn get_record(&self, request: GetRecordRequest) -> AppResult<Record> {
        self.repository.get(&request.id).await.map_err(|err| {
            if err.is_not_found() {
                AppError::not_found("Record")
            } else {
                internal("getting record", &err)
            }
        })
    }

    pub async fn list_records(&self) -> AppResult<Vec<Record>> {
        self.repository
            .list()
            .await
            .map_err(|err| internal("listing records", &err))
    }
}

fn internal(operation: &str, err: &RepositoryError) -> AppError {
    error!(operation, collection = err.collection(), error = %err, "record service error");
    AppError::internal()
}
