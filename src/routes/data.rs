use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};

use super::{ApiError, AppState, UserQuery};
use crate::models::{DataExport, DataImport, ImportSummary};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/export", get(export_data))
        .route("/import", post(import_data))
        .route("/data", delete(clear_all_data))
        .with_state(state)
}

async fn export_data(
    State(service): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<DataExport>, ApiError> {
    Ok(Json(service.export_data(query.user_id).await?))
}

async fn import_data(
    State(service): State<AppState>,
    Query(query): Query<UserQuery>,
    Json(bundle): Json<DataImport>,
) -> Result<Json<ImportSummary>, ApiError> {
    Ok(Json(service.import_data(query.user_id, bundle).await?))
}

async fn clear_all_data(
    State(service): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<StatusCode, ApiError> {
    service.clear_all_data(query.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
