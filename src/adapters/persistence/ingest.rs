use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{Postgres, Transaction};

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::ingest::{IngestStore, IngestTx, InsertOutcome},
    domain::entities::{
        history::NewHistoryEntry, raw_event::RawEvent, subscription::CurrentSubscription,
    },
};

/// Transaction-scoped handle over the audit/state/history tables. Everything
/// staged here becomes visible atomically on commit; dropping the handle
/// rolls the unit of work back.
pub struct PgIngestTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl IngestStore for PostgresPersistence {
    async fn begin(&self) -> AppResult<Box<dyn IngestTx>> {
        let tx = self.pool().begin().await.map_err(AppError::from)?;
        Ok(Box::new(PgIngestTx { tx }))
    }
}

#[async_trait]
impl IngestTx for PgIngestTx {
    async fn find_raw_event(&mut self, event_id: &str) -> AppResult<Option<RawEvent>> {
        let event = sqlx::query_as::<_, RawEvent>(
            r#"SELECT event_id, event_type, created_at, payload, processed_at
               FROM raw_events
               WHERE event_id = $1"#,
        )
        .bind(event_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        Ok(event)
    }

    async fn insert_raw_event(&mut self, event: &RawEvent) -> AppResult<InsertOutcome> {
        // DO NOTHING keeps a concurrent duplicate delivery from failing the
        // transaction; zero affected rows means the other worker won.
        let result = sqlx::query(
            r#"INSERT INTO raw_events (event_id, event_type, created_at, payload, processed_at)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (event_id) DO NOTHING"#,
        )
        .bind(&event.event_id)
        .bind(&event.event_type)
        .bind(event.created_at)
        .bind(&event.payload)
        .bind(event.processed_at)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn find_subscription_for_update(
        &mut self,
        subscription_id: &str,
    ) -> AppResult<Option<CurrentSubscription>> {
        // FOR UPDATE alone cannot lock a row that does not exist yet, so two
        // concurrent first events for the same subscription would both read
        // no prior state. The advisory lock is keyed by subscription id and
        // held until the transaction ends, covering the absent-row case.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(subscription_id)
            .execute(&mut *self.tx)
            .await
            .map_err(AppError::from)?;

        let subscription = sqlx::query_as::<_, CurrentSubscription>(
            r#"SELECT subscription_id, customer_id, status, current_product, current_price,
                      current_quantity, current_amount, currency, last_event_id, last_updated
               FROM current_subscriptions
               WHERE subscription_id = $1
               FOR UPDATE"#,
        )
        .bind(subscription_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        Ok(subscription)
    }

    async fn upsert_subscription(&mut self, subscription: &CurrentSubscription) -> AppResult<()> {
        sqlx::query(
            r#"INSERT INTO current_subscriptions
                   (subscription_id, customer_id, status, current_product, current_price,
                    current_quantity, current_amount, currency, last_event_id, last_updated)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               ON CONFLICT (subscription_id) DO UPDATE SET
                   customer_id = EXCLUDED.customer_id,
                   status = EXCLUDED.status,
                   current_product = EXCLUDED.current_product,
                   current_price = EXCLUDED.current_price,
                   current_quantity = EXCLUDED.current_quantity,
                   current_amount = EXCLUDED.current_amount,
                   currency = EXCLUDED.currency,
                   last_event_id = EXCLUDED.last_event_id,
                   last_updated = EXCLUDED.last_updated"#,
        )
        .bind(&subscription.subscription_id)
        .bind(&subscription.customer_id)
        .bind(&subscription.status)
        .bind(&subscription.current_product)
        .bind(&subscription.current_price)
        .bind(subscription.current_quantity)
        .bind(subscription.current_amount)
        .bind(&subscription.currency)
        .bind(&subscription.last_event_id)
        .bind(subscription.last_updated)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        Ok(())
    }

    async fn touch_subscription(
        &mut self,
        subscription_id: &str,
        event_id: &str,
        updated_at: NaiveDateTime,
    ) -> AppResult<()> {
        sqlx::query(
            r#"UPDATE current_subscriptions
               SET last_event_id = $2, last_updated = $3
               WHERE subscription_id = $1"#,
        )
        .bind(subscription_id)
        .bind(event_id)
        .bind(updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        Ok(())
    }

    async fn append_history(&mut self, entry: &NewHistoryEntry) -> AppResult<()> {
        sqlx::query(
            r#"INSERT INTO subscription_history
                   (subscription_id, event_id, change_type, previous_mrr, new_mrr, mrr_delta,
                    event_timestamp, product, price, quantity, currency)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(&entry.subscription_id)
        .bind(&entry.event_id)
        .bind(entry.change_type.as_str())
        .bind(entry.previous_mrr)
        .bind(entry.new_mrr)
        .bind(entry.mrr_delta)
        .bind(entry.event_timestamp)
        .bind(&entry.product)
        .bind(&entry.price)
        .bind(entry.quantity)
        .bind(&entry.currency)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(AppError::from)?;
        Ok(())
    }
}
