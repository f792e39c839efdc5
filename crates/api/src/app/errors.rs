use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use recordkeep_functions::{CallableError, HttpResponse};

/// Render an HTTP function's response; `None` body means an empty body.
pub fn http_response(response: HttpResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match response.body {
        Some(body) => (status, axum::Json(body)).into_response(),
        None => status.into_response(),
    }
}

/// Callable protocol error: `{ "error": { status, message, details? } }`.
pub fn callable_error_response(err: &CallableError) -> Response {
    let status = StatusCode::from_u16(err.code().http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, axum::Json(err.to_wire())).into_response()
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "message": message.into(),
            "httpCode": status.as_u16(),
        })),
    )
        .into_response()
}
