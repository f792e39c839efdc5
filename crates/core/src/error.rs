//! Error catalog.
//!
//! Every failure a caller can observe is one of a small, fixed set of kinds.
//! The kind determines the numeric `code` and the HTTP status; the message is
//! the only part that varies (e.g. which field was missing).

use serde::Serialize;
use thiserror::Error;

/// Result type used by domain handlers and services.
pub type AppResult<T> = Result<T, AppError>;

/// Failure kinds known to the catalog.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Catch-all for store failures and unexpected errors.
    Internal,
    /// A required request field was missing or empty.
    FieldRequired,
    /// The addressed document does not exist.
    NotFound,
}

impl ErrorKind {
    /// Stable numeric code exposed in error payloads.
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::FieldRequired => 2,
            ErrorKind::NotFound => 3,
        }
    }

    /// HTTP status this kind maps to at the boundary.
    pub fn http_code(self) -> u16 {
        match self {
            ErrorKind::Internal => 500,
            ErrorKind::FieldRequired => 400,
            ErrorKind::NotFound => 404,
        }
    }
}

/// Structured, catalogued error.
///
/// Serializes to the wire shape `{ "message", "code", "httpCode" }`, which is
/// also the response body the HTTP boundary returns.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    #[serde(skip)]
    kind: ErrorKind,
    message: String,
    code: u32,
    http_code: u16,
}

impl AppError {
    fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: kind.code(),
            http_code: kind.http_code(),
        }
    }

    pub fn internal() -> Self {
        Self::from_kind(ErrorKind::Internal, "Internal error")
    }

    pub fn field_required(field: &str) -> Self {
        Self::from_kind(ErrorKind::FieldRequired, format!("Field {field} is required"))
    }

    pub fn not_found(entity: &str) -> Self {
        Self::from_kind(ErrorKind::NotFound, format!("{entity} not found"))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn http_code(&self) -> u16 {
        self.http_code
    }

    /// Wire representation of this error.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "message": self.message,
            "code": self.code,
            "httpCode": self.http_code,
        })
    }
}
