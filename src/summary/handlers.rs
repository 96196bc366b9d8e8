use axum::{extract::State, routing::get, Json, Router};
use time::Date;
use tracing::{debug, instrument};

use super::dto::Summary;
use crate::state::AppState;

pub fn summary_routes() -> Router<AppState> {
    Router::new().route("/summary", get(get_summary))
}

#[instrument(skip(state))]
pub async fn get_summary(State(state): State<AppState>) -> Json<Summary> {
    let today = state.config.today();
    Json(summary_for(&state, today).await)
}

/// Summary of the current snapshot as seen on `today`.
pub async fn summary_for(state: &AppState, today: Date) -> Summary {
    let snapshot = state.ledger.lock().await.snapshot();
    let summary = Summary::build(&snapshot, today, state.config.utc_offset);
    debug!(
        day = %today,
        today = summary.today_calories,
        week = summary.week_calories,
        "summary computed"
    );
    summary
}
