//! HTTP endpoint factory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, info, warn};

use recordkeep_core::{AppError, AppResult};

use crate::handler::Handler;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    /// Any method the platform does not route (HEAD, OPTIONS, ...).
    Other(String),
}

impl HttpMethod {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            other => HttpMethod::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Other(other) => other,
        }
    }
}

impl core::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-neutral view of an inbound HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub query: HashMap<String, String>,
    /// Parsed JSON body (`Null` when absent).
    pub body: JsonValue,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, body: JsonValue) -> Self {
        Self {
            method,
            query: HashMap::new(),
            body,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn body_field(&self, key: &str) -> Option<&JsonValue> {
        self.body.get(key)
    }
}

/// Status plus optional JSON body. `None` means an empty body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Option<JsonValue>,
}

impl HttpResponse {
    pub fn ok(body: JsonValue) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self { status: 405, body: None }
    }

    /// The error's declared status with the catalog payload as body.
    pub fn from_error(err: &AppError) -> Self {
        Self {
            status: err.http_code(),
            body: Some(err.to_json()),
        }
    }
}

/// Rejects a request before it is assembled.
pub type HttpValidator = fn(&HttpRequest) -> AppResult<()>;

/// Builds the handler's typed request from a validated HTTP request.
pub type HttpAssembler<K> = fn(&HttpRequest) -> AppResult<K>;

/// Type-erased HTTP endpoint, as routed by the API.
#[async_trait]
pub trait HttpFunction: Send + Sync {
    /// Never fails: every outcome is an `HttpResponse`.
    async fn call(&self, request: HttpRequest) -> HttpResponse;
}

/// HTTP endpoint built from a handler, a validator and an assembler.
///
/// Pipeline: method gate (405, empty body) → validate → assemble → handle →
/// 200 with the JSON result, or the `AppError`'s status with its payload.
pub struct HttpHandler<K, T> {
    method: HttpMethod,
    handler: Arc<dyn Handler<K, T>>,
    validator: HttpValidator,
    assembler: HttpAssembler<K>,
}

impl<K, T> HttpHandler<K, T>
where
    K: Send + 'static,
    T: Serialize + Send + 'static,
{
    pub fn new(
        method: HttpMethod,
        handler: impl Handler<K, T> + 'static,
        validator: HttpValidator,
        assembler: HttpAssembler<K>,
    ) -> Self {
        Self {
            method,
            handler: Arc::new(handler),
            validator,
            assembler,
        }
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        if request.method != self.method {
            warn!(expected = %self.method, received = %request.method, "method not allowed");
            return HttpResponse::method_not_allowed();
        }

        info!(method = %request.method, body = %request.body, "request received");

        let outcome = self
            .run(&request)
            .await
            .and_then(|result| serde_json::to_value(result).map_err(|_| AppError::internal()));

        match outcome {
            Ok(body) => {
                info!(response = %body, "response sent");
                HttpResponse::ok(body)
            }
            Err(err) => {
                error!(error = %err, code = err.code(), http_code = err.http_code(), "error occurred");
                HttpResponse::from_error(&err)
            }
        }
    }

    async fn run(&self, request: &HttpRequest) -> AppResult<T> {
        (self.validator)(request)?;
        let typed = (self.assembler)(request)?;
        self.handler.handle(typed).await
    }
}

#[async_trait]
impl<K, T> HttpFunction for HttpHandler<K, T>
where
    K: Send + 'static,
    T: Serialize + Send + 'static,
{
    async fn call(&self, request: HttpRequest) -> HttpResponse {
        self.handle(request).await
    }
}
