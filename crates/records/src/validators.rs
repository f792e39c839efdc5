//! Request validators: reject a request before it is assembled.

use serde_json::Value as JsonValue;

use recordkeep_core::{AppError, AppResult};
use recordkeep_functions::{CallableRequest, HttpRequest};

/// A required text field must be present, a string, and non-empty.
fn require_text(value: Option<&JsonValue>, field: &str) -> AppResult<()> {
    match value.and_then(JsonValue::as_str) {
        Some(text) if !text.is_empty() => Ok(()),
        _ => Err(AppError::field_required(field)),
    }
}

pub fn validate_http_create_record_request(request: &HttpRequest) -> AppResult<()> {
    require_text(request.body_field("name"), "name")
}

pub fn validate_callable_create_record_request(request: &CallableRequest) -> AppResult<()> {
    require_text(request.data_field("name"), "name")
}

pub fn validate_http_get_record_request(request: &HttpRequest) -> AppResult<()> {
    match request.query_param("id") {
        Some(id) if !id.is_empty() => Ok(()),
        _ => Err(AppError::field_required("id")),
    }
}

pub fn validate_http_list_records_request(_request: &HttpRequest) -> AppResult<()> {
    Ok(())
}
