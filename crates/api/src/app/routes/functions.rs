use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;

use recordkeep_functions::{CallableRequest, Endpoint, HttpMethod, HttpRequest, HttpResponse};

use crate::app::{dto, errors, services::AppServices};
use crate::context::CallerContext;

/// Dispatch `/<name>` to the exported function of that name.
pub async fn invoke(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(name): Path<String>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let Some(endpoint) = services.exports.functions.get(&name) else {
        debug!(function = %name, "unknown function");
        return errors::json_error(StatusCode::NOT_FOUND, format!("Function {name} not found"));
    };

    match endpoint {
        Endpoint::Http(function) => {
            let mut request = HttpRequest::new(HttpMethod::parse(method.as_str()), dto::json_body(&body));
            for (key, value) in query {
                request = request.with_query(key, value);
            }
            errors::http_response(function.call(request).await)
        }
        Endpoint::Callable(function) => {
            if method != Method::POST {
                return errors::http_response(HttpResponse::method_not_allowed());
            }

            let mut request = CallableRequest::new(dto::callable_envelope(&body).data);
            if let Some(auth) = caller.into_auth() {
                request = request.with_auth(auth);
            }

            match function.call(request).await {
                Ok(result) => (StatusCode::OK, axum::Json(json!({ "result": result }))).into_response(),
                Err(err) => errors::callable_error_response(&err),
            }
        }
    }
}
