use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use super::{ApiError, AppState, UserQuery};
use crate::models::Prediction;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/predictions", get(get_predictions))
        .with_state(state)
}

async fn get_predictions(
    State(service): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Prediction>, ApiError> {
    service
        .predictions(query.user_id)
        .await?
        .map(Json)
        .ok_or(ApiError::Missing("no predictions for user"))
}
