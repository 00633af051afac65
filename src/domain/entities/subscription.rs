use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// Lifecycle statuses treated as currently billing.
pub const ACTIVE_LIKE_STATUSES: &[&str] = &["active", "trialing", "past_due"];

/// Whether a status string counts as currently billing. The provider's status
/// set is open, so anything unrecognized is treated as inactive.
pub fn is_active_like(status: &str) -> bool {
    ACTIVE_LIKE_STATUSES.contains(&status)
}

/// Latest known state of one subscription. One row per subscription id;
/// cancellation is a status value, the row is never deleted.
///
/// Invariant: `current_amount` is a non-negative monthly figure and is forced
/// to zero while the status sits outside the active-like set.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSubscription {
    pub subscription_id: String,
    pub customer_id: String,
    pub status: String,
    pub current_product: Option<String>,
    pub current_price: Option<String>,
    pub current_quantity: i32,
    pub current_amount: Decimal,
    pub currency: Option<String>,
    pub last_event_id: Option<String>,
    pub last_updated: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_like_covers_billing_statuses() {
        assert!(is_active_like("active"));
        assert!(is_active_like("trialing"));
        assert!(is_active_like("past_due"));
    }

    #[test]
    fn terminal_and_unknown_statuses_are_inactive() {
        assert!(!is_active_like("canceled"));
        assert!(!is_active_like("unpaid"));
        assert!(!is_active_like("incomplete_expired"));
        assert!(!is_active_like("paused"));
        assert!(!is_active_like(""));
    }
}
