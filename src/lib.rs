use std::sync::Arc;

use axum::{routing::get, Router};

pub mod analytics;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod service;
pub mod store;

use service::CycleService;

/// Every REST route plus `/health`, sharing one service.
pub fn app(service: Arc<CycleService>) -> Router {
    Router::new()
        .merge(routes::cycle::routes(service.clone()))
        .merge(routes::cycle_stats::routes(service.clone()))
        .merge(routes::predictions::routes(service.clone()))
        .merge(routes::calendar::routes(service.clone()))
        .merge(routes::symptoms::routes(service.clone()))
        .merge(routes::settings::routes(service.clone()))
        .merge(routes::data::routes(service))
        .route("/health", get(|| async { "✅ Backend up" }))
}
