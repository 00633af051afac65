use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};

use crate::{adapters::http::app_state::AppState, app_error::AppResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customer/{customer_id}/history", get(customer_history))
        .route("/mrr/monthly", get(monthly_mrr))
        .route("/mrr/yearly", get(yearly_mrr))
        .route("/subscriptions/summary", get(subscription_summary))
}

async fn customer_history(
    State(app_state): State<AppState>,
    Path(customer_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let history = app_state
        .report_use_cases
        .customer_history(&customer_id)
        .await?;
    Ok(Json(history))
}

async fn monthly_mrr(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let report = app_state.report_use_cases.monthly_mrr().await?;
    Ok(Json(report))
}

async fn yearly_mrr(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let report = app_state.report_use_cases.yearly_mrr().await?;
    Ok(Json(report))
}

async fn subscription_summary(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let summary = app_state.report_use_cases.subscription_summary().await?;
    Ok(Json(summary))
}
