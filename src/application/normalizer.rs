//! Event Normalizer: turns a loosely-typed provider payload into a canonical
//! tuple the reconciliation engine can act on. Pure transform, no I/O.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::app_error::{AppError, AppResult};

/// Event types that drive subscription state reconciliation.
pub const SUBSCRIPTION_EVENT_PREFIX: &str = "customer.subscription.";
/// Event types treated as renewal activity against an existing subscription.
pub const INVOICE_EVENT_PREFIX: &str = "invoice.";

const MONTHS_PER_YEAR: i64 = 12;

/// Canonical fields shared by every provider event.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub event_id: String,
    pub event_type: String,
    pub occurred_at: NaiveDateTime,
    pub payload: Value,
}

/// One lifecycle event's line items aggregated into a single monthly figure.
/// Product, price and currency come from the first item; quantity is the sum
/// across items.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUpdate {
    pub subscription_id: String,
    pub customer_id: String,
    pub status: String,
    pub monthly_amount: Decimal,
    pub product: String,
    pub price: String,
    pub quantity: i32,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub enum EventKind {
    /// Subscription lifecycle change. `None` when the item list is empty and
    /// there is nothing to apply.
    Lifecycle(Option<SubscriptionUpdate>),
    /// Renewal-style event referencing a subscription indirectly. `None` when
    /// the payload carries no subscription reference.
    Renewal(Option<String>),
    /// Recognized event type with no state effect; audit-recorded only.
    Other,
}

#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub envelope: EventEnvelope,
    pub kind: EventKind,
}

/// Validates the envelope and normalizes the payload for its event type.
/// Fails with [`AppError::MalformedEvent`] before any state is touched; there
/// is no default-to-now fallback for a missing timestamp.
pub fn normalize_event(payload: &Value) -> AppResult<NormalizedEvent> {
    let event_id = require_str(payload, "id")?.to_string();
    let event_type = require_str(payload, "type")?.to_string();

    let created = payload
        .get("created")
        .and_then(Value::as_i64)
        .ok_or_else(|| malformed("created must be an integer unix timestamp"))?;
    let occurred_at = DateTime::<Utc>::from_timestamp(created, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| malformed("created is out of range"))?;

    let kind = if event_type.starts_with(SUBSCRIPTION_EVENT_PREFIX) {
        EventKind::Lifecycle(normalize_subscription(payload)?)
    } else if event_type.starts_with(INVOICE_EVENT_PREFIX) {
        EventKind::Renewal(subscription_reference(payload))
    } else {
        EventKind::Other
    };

    Ok(NormalizedEvent {
        envelope: EventEnvelope {
            event_id,
            event_type,
            occurred_at,
            payload: payload.clone(),
        },
        kind,
    })
}

fn normalize_subscription(payload: &Value) -> AppResult<Option<SubscriptionUpdate>> {
    let object = payload
        .get("data")
        .and_then(|data| data.get("object"))
        .ok_or_else(|| malformed("data.object is missing"))?;

    let subscription_id = require_str(object, "id")?.to_string();
    let customer_id = require_str(object, "customer")?.to_string();
    let status = require_str(object, "status")?.to_string();

    let items = object
        .get("items")
        .and_then(|items| items.get("data"))
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("items.data must be an array"))?;

    // An empty item list is not an error; the event carries nothing to apply.
    if items.is_empty() {
        return Ok(None);
    }

    let mut monthly_amount = Decimal::ZERO;
    let mut total_quantity: i64 = 0;
    let mut first_item: Option<(String, String, String)> = None;

    for item in items {
        let plan = item
            .get("plan")
            .ok_or_else(|| malformed("item is missing a plan"))?;
        let amount_minor = plan
            .get("amount")
            .and_then(Value::as_i64)
            .ok_or_else(|| malformed("plan.amount must be an integer"))?;
        let quantity = item
            .get("quantity")
            .and_then(Value::as_i64)
            .ok_or_else(|| malformed("item.quantity must be an integer"))?;
        let interval = plan.get("interval").and_then(Value::as_str);

        if first_item.is_none() {
            first_item = Some((
                str_or_empty(plan, "product"),
                str_or_empty(plan, "id"),
                str_or_empty(plan, "currency"),
            ));
        }

        // Provider amounts arrive in the smallest currency unit; scale 2
        // converts to the major unit exactly.
        let mut item_amount = Decimal::new(amount_minor, 2) * Decimal::from(quantity);
        if interval == Some("year") {
            item_amount /= Decimal::from(MONTHS_PER_YEAR);
        }
        monthly_amount += item_amount;
        total_quantity += quantity;
    }

    let (product, price, currency) = first_item.unwrap_or_default();
    let quantity =
        i32::try_from(total_quantity).map_err(|_| malformed("item quantities overflow"))?;

    Ok(Some(SubscriptionUpdate {
        subscription_id,
        customer_id,
        status,
        monthly_amount,
        product,
        price,
        quantity,
        currency,
    }))
}

/// Invoice-style payloads carry the subscription as a reference field, not as
/// the event object itself.
fn subscription_reference(payload: &Value) -> Option<String> {
    payload
        .get("data")
        .and_then(|data| data.get("object"))
        .and_then(|object| object.get("subscription"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn require_str<'a>(value: &'a Value, key: &str) -> AppResult<&'a str> {
    match value.get(key).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(malformed(&format!("{key} is missing or empty"))),
    }
}

fn str_or_empty(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn malformed(msg: &str) -> AppError {
    AppError::MalformedEvent(msg.to_string())
}
