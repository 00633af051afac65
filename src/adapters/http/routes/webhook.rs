use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::Serialize;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::use_cases::ingest::IngestOutcome,
};

#[derive(Serialize)]
struct WebhookResponse {
    message: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(receive))
}

/// Accepts one provider event. Duplicates are acknowledged with 200 so the
/// event source never treats a redelivery as a failure.
async fn receive(
    State(app_state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    let outcome = app_state.ingest_use_cases.process_event(&payload).await?;

    let message = match outcome {
        IngestOutcome::Applied(_) => "Event processed",
        IngestOutcome::Duplicate => "Event already processed",
        IngestOutcome::NothingToApply => "Event accepted, nothing to apply",
        IngestOutcome::UnknownSubscription => "Event accepted for unknown subscription",
        IngestOutcome::Ignored => "Event recorded",
    };

    Ok(Json(WebhookResponse { message }))
}
