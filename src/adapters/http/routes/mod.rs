pub mod events;
pub mod reports;
pub mod webhook;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/webhook", webhook::router())
        .nest("/events", events::router())
        .nest("/reports", reports::router())
}
