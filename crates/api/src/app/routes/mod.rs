use axum::{Router, routing::any};

pub mod functions;
pub mod system;

/// Every exported function is served at `/<name>`.
pub fn router() -> Router {
    Router::new().route("/:name", any(functions::invoke))
}
