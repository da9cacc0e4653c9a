use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};

use super::{ApiError, AppState, UserQuery};
use crate::models::CycleStats;

pub async fn get_cycle_stats(
    State(service): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<CycleStats>, ApiError> {
    let stats = service.cycle_stats(query.user_id).await?;
    Ok(Json(stats))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/cycle-stats", get(get_cycle_stats))
        .with_state(state)
}
