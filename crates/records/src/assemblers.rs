//! Request assemblers: build typed requests from validated transport requests.

use serde_json::Value as JsonValue;

use recordkeep_core::{AppError, AppResult, DocumentId};
use recordkeep_functions::{CallableRequest, HttpRequest};

use crate::record::RecordPatch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRecordRequest {
    pub name: String,
}

impl From<CreateRecordRequest> for RecordPatch {
    fn from(request: CreateRecordRequest) -> Self {
        RecordPatch::named(request.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRecordRequest {
    pub id: DocumentId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListRecordsRequest;

fn text(value: Option<&JsonValue>) -> String {
    value.and_then(JsonValue::as_str).unwrap_or_default().to_string()
}

pub fn assemble_http_create_record_request(request: &HttpRequest) -> AppResult<CreateRecordRequest> {
    Ok(CreateRecordRequest {
        name: text(request.body_field("name")),
    })
}

pub fn assemble_callable_create_record_request(request: &CallableRequest) -> AppResult<CreateRecordRequest> {
    Ok(CreateRecordRequest {
        name: text(request.data_field("name")),
    })
}

/// An id that cannot address a document (e.g. contains `/`) is simply not found.
pub fn assemble_http_get_record_request(request: &HttpRequest) -> AppResult<GetRecordRequest> {
    let raw = request.query_param("id").unwrap_or_default();
    let id = DocumentId::new(raw).map_err(|_| AppError::not_found("Record"))?;
    Ok(GetRecordRequest { id })
}

pub fn assemble_http_list_records_request(_request: &HttpRequest) -> AppResult<ListRecordsRequest> {
    Ok(ListRecordsRequest)
}
