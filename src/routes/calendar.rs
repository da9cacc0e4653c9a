use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use super::{ApiError, AppState, UserQuery};
use crate::analytics::MarkedDates;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/marked-dates", get(get_marked_dates))
        .with_state(state)
}

/// Period and predicted ovulation days, keyed by `YYYY-MM-DD` for the calendar view.
async fn get_marked_dates(
    State(service): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<MarkedDates>, ApiError> {
    Ok(Json(service.marked_dates(query.user_id).await?))
}
