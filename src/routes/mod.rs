use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::StoreError;
use crate::service::CycleService;

pub mod calendar;
pub mod cycle;
pub mod cycle_stats;
pub mod data;
pub mod predictions;
pub mod settings;
pub mod symptoms;

pub type AppState = Arc<CycleService>;

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

/// Handler failures. Unknown ids and empty lookups are 404, store outages 503.
#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    Missing(&'static str),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Store(err @ StoreError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            ApiError::Store(err @ StoreError::Unavailable { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            ApiError::Missing(what) => (StatusCode::NOT_FOUND, what.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
