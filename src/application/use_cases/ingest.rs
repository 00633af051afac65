//! Reconciliation engine: applies one normalized provider event against the
//! audit log, the current-state table, and the history ledger inside a single
//! transaction supplied by the store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{
    app_error::AppResult,
    application::normalizer::{
        EventEnvelope, EventKind, SubscriptionUpdate, normalize_event,
    },
    domain::entities::{
        change_type::ChangeType,
        history::NewHistoryEntry,
        raw_event::RawEvent,
        subscription::{CurrentSubscription, is_active_like},
    },
};

/// Outcome of an insert guarded by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The key already exists; a concurrent worker won the race.
    Duplicate,
}

/// One atomic unit of work against the three stores. Nothing staged through
/// the handle is visible until `commit`; dropping it rolls everything back.
#[async_trait]
pub trait IngestTx: Send {
    async fn find_raw_event(&mut self, event_id: &str) -> AppResult<Option<RawEvent>>;

    async fn insert_raw_event(&mut self, event: &RawEvent) -> AppResult<InsertOutcome>;

    /// Loads prior state and serializes concurrent reconciliation of the same
    /// subscription until this transaction ends, whether or not a row exists
    /// yet.
    async fn find_subscription_for_update(
        &mut self,
        subscription_id: &str,
    ) -> AppResult<Option<CurrentSubscription>>;

    async fn upsert_subscription(&mut self, subscription: &CurrentSubscription) -> AppResult<()>;

    /// Refreshes last-event bookkeeping without touching monetary state.
    async fn touch_subscription(
        &mut self,
        subscription_id: &str,
        event_id: &str,
        updated_at: NaiveDateTime,
    ) -> AppResult<()>;

    async fn append_history(&mut self, entry: &NewHistoryEntry) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

#[async_trait]
pub trait IngestStore: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn IngestTx>>;
}

/// How the engine disposed of one inbound event. Recoverable conditions are
/// reported here, never raised as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Applied(ChangeType),
    /// Idempotency gate hit; the event was fully processed before.
    Duplicate,
    /// Lifecycle event with an empty item list; audit-recorded only.
    NothingToApply,
    /// Renewal referencing a subscription never seen via a lifecycle event.
    UnknownSubscription,
    /// Recognized event type with no state effect; audit-recorded only.
    Ignored,
}

/// Monetary effect of one lifecycle event against prior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub change_type: ChangeType,
    pub previous_amount: Decimal,
    pub new_amount: Decimal,
}

/// Deterministic decision table for a lifecycle transition.
///
/// Churned subscriptions carry no recurring revenue, so any transition that
/// lands outside the active-like set forces the stored amount to zero. That
/// includes the already-inactive `no_change` branch, which keeps the
/// ledger-sum invariant intact for subscriptions that receive further events
/// after churning.
pub fn classify(
    prior: Option<&CurrentSubscription>,
    update: &SubscriptionUpdate,
) -> Reconciliation {
    let Some(prior) = prior else {
        return Reconciliation {
            change_type: ChangeType::New,
            previous_amount: Decimal::ZERO,
            new_amount: update.monthly_amount,
        };
    };

    let previous_amount = prior.current_amount;

    if !is_active_like(&update.status) {
        let change_type = if is_active_like(&prior.status) {
            ChangeType::Churn
        } else {
            ChangeType::NoChange
        };
        return Reconciliation {
            change_type,
            previous_amount,
            new_amount: Decimal::ZERO,
        };
    }

    let change_type = if update.monthly_amount > previous_amount {
        ChangeType::Upgrade
    } else if update.monthly_amount < previous_amount {
        ChangeType::Downgrade
    } else {
        ChangeType::NoChange
    };

    Reconciliation {
        change_type,
        previous_amount,
        new_amount: update.monthly_amount,
    }
}

#[derive(Clone)]
pub struct IngestUseCases {
    store: Arc<dyn IngestStore>,
}

impl IngestUseCases {
    pub fn new(store: Arc<dyn IngestStore>) -> Self {
        Self { store }
    }

    /// Applies one provider event: idempotency gate, audit write, dispatch by
    /// type, reconciliation, history append. Either everything commits or
    /// nothing does.
    #[instrument(skip(self, payload))]
    pub async fn process_event(&self, payload: &Value) -> AppResult<IngestOutcome> {
        let event = normalize_event(payload)?;
        let envelope = &event.envelope;

        let mut tx = self.store.begin().await?;

        if tx.find_raw_event(&envelope.event_id).await?.is_some() {
            info!(event_id = %envelope.event_id, "Event already processed");
            return Ok(IngestOutcome::Duplicate);
        }

        let raw_event = RawEvent {
            event_id: envelope.event_id.clone(),
            event_type: envelope.event_type.clone(),
            created_at: envelope.occurred_at,
            payload: envelope.payload.clone(),
            processed_at: Some(Utc::now().naive_utc()),
        };
        if tx.insert_raw_event(&raw_event).await? == InsertOutcome::Duplicate {
            // Lost the race against a concurrent delivery of the same event;
            // discard the staged work instead of double-applying.
            info!(event_id = %envelope.event_id, "Event already processed");
            return Ok(IngestOutcome::Duplicate);
        }

        let outcome = match &event.kind {
            EventKind::Lifecycle(Some(update)) => {
                self.reconcile(tx.as_mut(), envelope, update).await?
            }
            EventKind::Lifecycle(None) => IngestOutcome::NothingToApply,
            EventKind::Renewal(Some(subscription_id)) => {
                self.record_renewal(tx.as_mut(), envelope, subscription_id)
                    .await?
            }
            EventKind::Renewal(None) => IngestOutcome::Ignored,
            EventKind::Other => IngestOutcome::Ignored,
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn reconcile(
        &self,
        tx: &mut dyn IngestTx,
        envelope: &EventEnvelope,
        update: &SubscriptionUpdate,
    ) -> AppResult<IngestOutcome> {
        let prior = tx
            .find_subscription_for_update(&update.subscription_id)
            .await?;
        let reconciliation = classify(prior.as_ref(), update);

        let subscription = CurrentSubscription {
            subscription_id: update.subscription_id.clone(),
            customer_id: update.customer_id.clone(),
            status: update.status.clone(),
            current_product: Some(update.product.clone()),
            current_price: Some(update.price.clone()),
            current_quantity: update.quantity,
            current_amount: reconciliation.new_amount,
            currency: Some(update.currency.clone()),
            last_event_id: Some(envelope.event_id.clone()),
            last_updated: envelope.occurred_at,
        };
        tx.upsert_subscription(&subscription).await?;

        // Every accepted lifecycle event leaves a ledger row, no_change
        // included, so the audit trail stays complete.
        tx.append_history(&NewHistoryEntry {
            subscription_id: update.subscription_id.clone(),
            event_id: envelope.event_id.clone(),
            change_type: reconciliation.change_type,
            previous_mrr: reconciliation.previous_amount,
            new_mrr: reconciliation.new_amount,
            mrr_delta: reconciliation.new_amount - reconciliation.previous_amount,
            event_timestamp: envelope.occurred_at,
            product: subscription.current_product.clone(),
            price: subscription.current_price.clone(),
            quantity: subscription.current_quantity,
            currency: subscription.currency.clone(),
        })
        .await?;

        Ok(IngestOutcome::Applied(reconciliation.change_type))
    }

    async fn record_renewal(
        &self,
        tx: &mut dyn IngestTx,
        envelope: &EventEnvelope,
        subscription_id: &str,
    ) -> AppResult<IngestOutcome> {
        let Some(subscription) = tx.find_subscription_for_update(subscription_id).await? else {
            warn!(
                subscription_id,
                event_id = %envelope.event_id,
                "Received renewal for unknown subscription"
            );
            return Ok(IngestOutcome::UnknownSubscription);
        };

        // Renewals do not move MRR; the ledger row carries a zero delta.
        tx.append_history(&NewHistoryEntry {
            subscription_id: subscription.subscription_id.clone(),
            event_id: envelope.event_id.clone(),
            change_type: ChangeType::Renewal,
            previous_mrr: subscription.current_amount,
            new_mrr: subscription.current_amount,
            mrr_delta: Decimal::ZERO,
            event_timestamp: envelope.occurred_at,
            product: subscription.current_product.clone(),
            price: subscription.current_price.clone(),
            quantity: subscription.current_quantity,
            currency: subscription.currency.clone(),
        })
        .await?;

        tx.touch_subscription(subscription_id, &envelope.event_id, envelope.occurred_at)
            .await?;

        Ok(IngestOutcome::Applied(ChangeType::Renewal))
    }
}
