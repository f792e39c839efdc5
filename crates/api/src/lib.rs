//! HTTP API: exposes module functions over axum and runs the trigger runner.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
