//! HTTP application wiring.
//!
//! - `services.rs`: store, change feed, modules and the trigger runner
//! - `routes/`: health check plus one dynamic route per exported function
//! - `dto.rs`: request body parsing
//! - `errors.rs`: response shaping for both function protocols

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the router together with the services it serves.
///
/// The caller keeps the services handle to shut the trigger runner down.
pub async fn build(config: &AppConfig) -> anyhow::Result<(Router, Arc<services::AppServices>)> {
    let jwt = Arc::new(recordkeep_auth::Hs256JwtValidator::new(config.jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::build_services(config).await?);

    let functions = routes::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::identity_middleware,
        ));

    let router = Router::new()
        .route("/health", get(routes::system::health))
        .merge(functions);

    Ok((router, services))
}

/// Build the full HTTP router (public entrypoint used by tests and embedders).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let (router, _services) = build(config).await?;
    Ok(router)
}
