use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// Verbatim audit record for one inbound provider event. Inserted exactly
/// once per unique event id, never updated or deleted; the event id doubles
/// as the idempotency key.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub event_id: String,
    pub event_type: String,
    pub created_at: NaiveDateTime,
    pub payload: serde_json::Value,
    pub processed_at: Option<NaiveDateTime>,
}
