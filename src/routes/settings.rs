use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use super::{ApiError, AppState, UserQuery};
use crate::models::{Settings, SettingsPatch, SettingsRecord};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/settings", get(get_settings).put(update_settings))
        .with_state(state)
}

async fn get_settings(
    State(service): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Settings>, ApiError> {
    Ok(Json(service.settings(query.user_id).await?))
}

async fn update_settings(
    State(service): State<AppState>,
    Query(query): Query<UserQuery>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<SettingsRecord>, ApiError> {
    Ok(Json(service.update_settings(query.user_id, patch).await?))
}
