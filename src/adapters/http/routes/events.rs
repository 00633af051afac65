use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use crate::{adapters::http::app_state::AppState, app_error::AppResult};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_events))
}

async fn list_events(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let events = app_state.report_use_cases.list_raw_events().await?;
    Ok(Json(events))
}
