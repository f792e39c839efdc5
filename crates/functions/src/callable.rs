//! Callable (RPC-style) endpoint factory.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use thiserror::Error;
use tracing::{error, info};

use recordkeep_auth::AuthContext;
use recordkeep_core::AppResult;

use crate::handler::Handler;

/// Callable invocation envelope: `{ data, auth? }`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallableRequest {
    pub data: JsonValue,
    pub auth: Option<AuthContext>,
}

impl CallableRequest {
    pub fn new(data: JsonValue) -> Self {
        Self { data, auth: None }
    }

    pub fn with_auth(mut self, auth: AuthContext) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn data_field(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }
}

/// Error kinds a callable can fail with on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FunctionsErrorCode {
    Unauthenticated,
    Internal,
}

impl FunctionsErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            FunctionsErrorCode::Unauthenticated => "unauthenticated",
            FunctionsErrorCode::Internal => "internal",
        }
    }

    /// Protocol status name (`UNAUTHENTICATED`, `INTERNAL`).
    pub fn status(self) -> &'static str {
        match self {
            FunctionsErrorCode::Unauthenticated => "UNAUTHENTICATED",
            FunctionsErrorCode::Internal => "INTERNAL",
        }
    }

    pub fn http_status(self) -> u16 {
        match self {
            FunctionsErrorCode::Unauthenticated => 401,
            FunctionsErrorCode::Internal => 500,
        }
    }
}

impl core::fmt::Display for FunctionsErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct CallableError {
    code: FunctionsErrorCode,
    message: String,
    details: Option<JsonValue>,
}

impl CallableError {
    pub fn unauthenticated() -> Self {
        Self {
            code: FunctionsErrorCode::Unauthenticated,
            message: "Authentication required".to_string(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>, details: Option<JsonValue>) -> Self {
        Self {
            code: FunctionsErrorCode::Internal,
            message: message.into(),
            details,
        }
    }

    pub fn code(&self) -> FunctionsErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&JsonValue> {
        self.details.as_ref()
    }

    /// Protocol error body: `{ "error": { status, message, details? } }`.
    pub fn to_wire(&self) -> JsonValue {
        let mut error = json!({
            "status": self.code.status(),
            "message": self.message,
        });
        if let Some(details) = &self.details {
            error["details"] = details.clone();
        }
        json!({ "error": error })
    }
}

/// Rejects a callable request before it is assembled.
pub type CallableValidator = fn(&CallableRequest) -> AppResult<()>;

/// Builds the handler's typed request from a validated callable request.
pub type CallableAssembler<K> = fn(&CallableRequest) -> AppResult<K>;

/// Type-erased callable endpoint, as routed by the API.
#[async_trait]
pub trait CallableFunction: Send + Sync {
    async fn call(&self, request: CallableRequest) -> Result<JsonValue, CallableError>;
}

/// Callable endpoint built from a handler, a validator and an assembler.
///
/// Authentication is required unless `allow_unauthenticated()` is used; a
/// missing identity fails with `unauthenticated` before validation. Any
/// validation or handler error is re-raised as `internal`, keeping the message
/// and attaching the original error payload as `details`.
pub struct CallableHandler<K, T> {
    handler: Arc<dyn Handler<K, T>>,
    validator: CallableValidator,
    assembler: CallableAssembler<K>,
    require_auth: bool,
}

impl<K, T> CallableHandler<K, T>
where
    K: Send + 'static,
    T: Serialize + Send + 'static,
{
    pub fn new(
        handler: impl Handler<K, T> + 'static,
        validator: CallableValidator,
        assembler: CallableAssembler<K>,
    ) -> Self {
        Self {
            handler: Arc::new(handler),
            validator,
            assembler,
            require_auth: true,
        }
    }

    pub fn allow_unauthenticated(mut self) -> Self {
        self.require_auth = false;
        self
    }

    pub fn requires_auth(&self) -> bool {
        self.require_auth
    }

    /// Run the pipeline and return the handler's result as is.
    pub async fn invoke(&self, request: CallableRequest) -> Result<T, CallableError> {
        if self.require_auth && request.auth.is_none() {
            error!("authentication required");
            return Err(CallableError::unauthenticated());
        }

        info!(
            uid = request.auth.as_ref().map(|auth| auth.uid().as_str()),
            data = %request.data,
            "request received"
        );

        match self.run(&request).await {
            Ok(result) => {
                info!("response sent");
                Ok(result)
            }
            Err(err) => {
                error!(error = %err, code = err.code(), "error occurred");
                Err(CallableError::internal(err.message(), Some(err.to_json())))
            }
        }
    }

    async fn run(&self, request: &CallableRequest) -> AppResult<T> {
        (self.validator)(request)?;
        let typed = (self.assembler)(request)?;
        self.handler.handle(typed).await
    }
}

#[async_trait]
impl<K, T> CallableFunction for CallableHandler<K, T>
where
    K: Send + 'static,
    T: Serialize + Send + 'static,
{
    async fn call(&self, request: CallableRequest) -> Result<JsonValue, CallableError> {
        let result = self.invoke(request).await?;
        serde_json::to_value(result).map_err(|e| CallableError::internal(e.to_string(), None))
    }
}
