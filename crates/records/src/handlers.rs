use async_trait::async_trait;

use recordkeep_core::AppResult;
use recordkeep_functions::Handler;

use crate::assemblers::{CreateRecordRequest, GetRecordRequest, ListRecordsRequest};
use crate::record::Record;
use crate::service::RecordService;

pub struct CreateRecordHandler {
    service: RecordService,
}

impl CreateRecordHandler {
    pub fn new(service: RecordService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Handler<CreateRecordRequest, Record> for CreateRecordHandler {
    async fn handle(&self, request: CreateRecordRequest) -> AppResult<Record> {
        self.service.create_record(request).await
    }
}

pub struct GetRecordHandler {
    service: RecordService,
}

impl GetRecordHandler {
    pub fn new(service: RecordService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Handler<GetRecordRequest, Record> for GetRecordHandler {
    async fn handle(&self, request: GetRecordRequest) -> AppResult<Record> {
        self.service.get_record(request).await
    }
}

pub struct ListRecordsHandler {
    service: RecordService,
}

impl ListRecordsHandler {
    pub fn new(service: RecordService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Handler<ListRecordsRequest, Vec<Record>> for ListRecordsHandler {
    async fn handle(&self, _request: ListRecordsRequest) -> AppResult<Vec<Record>> {
        self.service.list_records().await
    }
}
