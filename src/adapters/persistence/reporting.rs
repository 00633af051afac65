use async_trait::async_trait;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::reports::{MrrReportRow, ReportingRepo, StatusBreakdown},
    domain::entities::{
        change_type::ChangeType, history::SubscriptionHistoryEntry, raw_event::RawEvent,
    },
};

fn row_to_history(row: sqlx::postgres::PgRow) -> SubscriptionHistoryEntry {
    SubscriptionHistoryEntry {
        id: row.get("id"),
        subscription_id: row.get("subscription_id"),
        event_id: row.get("event_id"),
        change_type: ChangeType::from_str(row.get::<String, _>("change_type").as_str()),
        previous_mrr: row.get("previous_mrr"),
        new_mrr: row.get("new_mrr"),
        mrr_delta: row.get("mrr_delta"),
        event_timestamp: row.get("event_timestamp"),
        product: row.get("product"),
        price: row.get("price"),
        quantity: row.get("quantity"),
        currency: row.get("currency"),
    }
}

fn row_to_mrr_report(row: sqlx::postgres::PgRow) -> MrrReportRow {
    MrrReportRow {
        period: row.get("period"),
        new_mrr: row.get("new_mrr"),
        expansion_mrr: row.get("expansion_mrr"),
        contraction_mrr: row.get("contraction_mrr"),
        churned_mrr: row.get("churned_mrr"),
        net_mrr_change: row.get("net_mrr_change"),
    }
}

const HISTORY_COLS: &str = r#"
    id, subscription_id, event_id, change_type, previous_mrr, new_mrr,
    mrr_delta, event_timestamp, product, price, quantity, currency
"#;

#[async_trait]
impl ReportingRepo for PostgresPersistence {
    async fn list_raw_events(&self) -> AppResult<Vec<RawEvent>> {
        let events = sqlx::query_as::<_, RawEvent>(
            r#"SELECT event_id, event_type, created_at, payload, processed_at
               FROM raw_events
               ORDER BY created_at DESC"#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(events)
    }

    async fn customer_history(
        &self,
        customer_id: &str,
    ) -> AppResult<Vec<SubscriptionHistoryEntry>> {
        let rows = sqlx::query(&format!(
            r#"SELECT {} FROM subscription_history h
               WHERE EXISTS (
                   SELECT 1 FROM current_subscriptions c
                   WHERE c.customer_id = $1 AND c.subscription_id = h.subscription_id
               )
               ORDER BY event_timestamp"#,
            HISTORY_COLS
        ))
        .bind(customer_id)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_history).collect())
    }

    async fn monthly_mrr(&self) -> AppResult<Vec<MrrReportRow>> {
        let rows = sqlx::query(
            r#"SELECT month AS period, new_mrr, expansion_mrr, contraction_mrr,
                      churned_mrr, net_mrr_change
               FROM monthly_mrr_report
               ORDER BY month"#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_mrr_report).collect())
    }

    async fn yearly_mrr(&self) -> AppResult<Vec<MrrReportRow>> {
        let rows = sqlx::query(
            r#"SELECT to_char(event_timestamp, 'YYYY') AS period,
                      COALESCE(SUM(mrr_delta) FILTER (WHERE change_type = 'new'), 0) AS new_mrr,
                      COALESCE(SUM(mrr_delta) FILTER (WHERE change_type = 'upgrade'), 0) AS expansion_mrr,
                      COALESCE(SUM(mrr_delta) FILTER (WHERE change_type = 'downgrade'), 0) AS contraction_mrr,
                      COALESCE(SUM(mrr_delta) FILTER (WHERE change_type = 'churn'), 0) AS churned_mrr,
                      SUM(mrr_delta) AS net_mrr_change
               FROM subscription_history
               GROUP BY to_char(event_timestamp, 'YYYY')
               ORDER BY period"#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_mrr_report).collect())
    }

    async fn status_breakdown(&self) -> AppResult<Vec<StatusBreakdown>> {
        let rows = sqlx::query(
            r#"SELECT status, COUNT(*) AS count, COALESCE(SUM(current_amount), 0) AS total_mrr
               FROM current_subscriptions
               GROUP BY status
               ORDER BY status"#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| StatusBreakdown {
                status: row.get("status"),
                count: row.get("count"),
                total_mrr: row.get("total_mrr"),
            })
            .collect())
    }
}
