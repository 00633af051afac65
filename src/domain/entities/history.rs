use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::entities::change_type::ChangeType;

/// One row of the append-only monetized-change ledger. Never mutated or
/// deleted; the sum of `mrr_delta` per subscription reconstructs the current
/// amount at any point in time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionHistoryEntry {
    pub id: i64,
    pub subscription_id: String,
    pub event_id: String,
    pub change_type: ChangeType,
    pub previous_mrr: Decimal,
    pub new_mrr: Decimal,
    pub mrr_delta: Decimal,
    pub event_timestamp: NaiveDateTime,
    pub product: Option<String>,
    pub price: Option<String>,
    pub quantity: i32,
    pub currency: Option<String>,
}

/// Ledger row as appended by the engine; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub subscription_id: String,
    pub event_id: String,
    pub change_type: ChangeType,
    pub previous_mrr: Decimal,
    pub new_mrr: Decimal,
    pub mrr_delta: Decimal,
    pub event_timestamp: NaiveDateTime,
    pub product: Option<String>,
    pub price: Option<String>,
    pub quantity: i32,
    pub currency: Option<String>,
}
