use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiError, AppState, UserQuery};
use crate::models::{Cycle, CyclePatch, CycleSummary, NewCycleRequest};

#[derive(Deserialize)]
pub struct NewCycle {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub cycle: NewCycleRequest,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/cycles", get(list_cycles).post(create_cycle))
        .route("/cycles/:id", patch(update_cycle).delete(delete_cycle))
        .route("/cycle", get(get_cycle_summary))
        .route("/cycle/current", get(get_current_cycle))
        .with_state(state)
}

async fn create_cycle(
    State(service): State<AppState>,
    Json(body): Json<NewCycle>,
) -> Result<(StatusCode, Json<Cycle>), ApiError> {
    let cycle = service.add_cycle(body.user_id, body.cycle).await?;
    Ok((StatusCode::CREATED, Json(cycle)))
}

async fn list_cycles(
    State(service): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Vec<Cycle>>, ApiError> {
    Ok(Json(service.cycles(params.user_id).await?))
}

async fn update_cycle(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CyclePatch>,
) -> Result<Json<Cycle>, ApiError> {
    Ok(Json(service.update_cycle(id, body).await?))
}

async fn delete_cycle(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    service.delete_cycle(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_current_cycle(
    State(service): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Cycle>, ApiError> {
    service
        .current_cycle(params.user_id)
        .await?
        .map(Json)
        .ok_or(ApiError::Missing("no cycles recorded"))
}

async fn get_cycle_summary(
    State(service): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<CycleSummary>, ApiError> {
    service
        .cycle_summary(params.user_id)
        .await?
        .map(Json)
        .ok_or(ApiError::Missing("no cycles recorded"))
}
