use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::models::{NewSymptomRequest, Symptom, SymptomPatch};

#[derive(Deserialize)]
pub struct NewSymptom {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub symptom: NewSymptomRequest,
}

#[derive(Deserialize)]
struct SymptomQuery {
    user_id: Uuid,
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct DayQuery {
    user_id: Uuid,
    date: NaiveDate,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/symptoms", get(get_symptoms).post(log_symptom))
        .route("/symptoms/:id", patch(update_symptom).delete(delete_symptom))
        .route("/symptom", get(get_symptom_on_day))
        .with_state(state)
}

async fn log_symptom(
    State(service): State<AppState>,
    Json(body): Json<NewSymptom>,
) -> Result<(StatusCode, Json<Symptom>), ApiError> {
    let symptom = service.add_symptom(body.user_id, body.symptom).await?;
    Ok((StatusCode::CREATED, Json(symptom)))
}

async fn get_symptoms(
    State(service): State<AppState>,
    Query(query): Query<SymptomQuery>,
) -> Result<Json<Vec<Symptom>>, ApiError> {
    let symptoms = service.symptoms_matching(query.user_id, query.date).await?;
    Ok(Json(symptoms))
}

async fn get_symptom_on_day(
    State(service): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Symptom>, ApiError> {
    service
        .symptoms_on(query.user_id, query.date)
        .await?
        .map(Json)
        .ok_or(ApiError::Missing("no symptoms logged on that date"))
}

async fn update_symptom(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SymptomPatch>,
) -> Result<Json<Symptom>, ApiError> {
    Ok(Json(service.update_symptom(id, body).await?))
}

async fn delete_symptom(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    service.delete_symptom(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
