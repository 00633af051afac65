use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    app_error::AppResult,
    domain::entities::{history::SubscriptionHistoryEntry, raw_event::RawEvent},
};

/// One period row of the MRR movement report, split by classification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MrrReportRow {
    pub period: String,
    pub new_mrr: Decimal,
    pub expansion_mrr: Decimal,
    pub contraction_mrr: Decimal,
    pub churned_mrr: Decimal,
    pub net_mrr_change: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub status: String,
    pub count: i64,
    pub total_mrr: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub total_active_subscriptions: i64,
    pub total_active_mrr: Decimal,
    pub details: Vec<StatusBreakdown>,
}

/// Read-only aggregate queries over the audit log, the current-state table,
/// and the history ledger. No state-machine logic lives behind this trait.
#[async_trait]
pub trait ReportingRepo: Send + Sync {
    async fn list_raw_events(&self) -> AppResult<Vec<RawEvent>>;
    async fn customer_history(&self, customer_id: &str)
    -> AppResult<Vec<SubscriptionHistoryEntry>>;
    async fn monthly_mrr(&self) -> AppResult<Vec<MrrReportRow>>;
    async fn yearly_mrr(&self) -> AppResult<Vec<MrrReportRow>>;
    async fn status_breakdown(&self) -> AppResult<Vec<StatusBreakdown>>;
}

#[derive(Clone)]
pub struct ReportUseCases {
    repo: Arc<dyn ReportingRepo>,
}

impl ReportUseCases {
    pub fn new(repo: Arc<dyn ReportingRepo>) -> Self {
        Self { repo }
    }

    pub async fn list_raw_events(&self) -> AppResult<Vec<RawEvent>> {
        self.repo.list_raw_events().await
    }

    pub async fn customer_history(
        &self,
        customer_id: &str,
    ) -> AppResult<Vec<SubscriptionHistoryEntry>> {
        self.repo.customer_history(customer_id).await
    }

    pub async fn monthly_mrr(&self) -> AppResult<Vec<MrrReportRow>> {
        self.repo.monthly_mrr().await
    }

    pub async fn yearly_mrr(&self) -> AppResult<Vec<MrrReportRow>> {
        self.repo.yearly_mrr().await
    }

    pub async fn subscription_summary(&self) -> AppResult<SubscriptionSummary> {
        let details = self.repo.status_breakdown().await?;

        let total_active_subscriptions = details
            .iter()
            .filter(|d| d.status == "active")
            .map(|d| d.count)
            .sum();
        let total_active_mrr = details
            .iter()
            .filter(|d| d.status == "active")
            .map(|d| d.total_mrr)
            .sum();

        Ok(SubscriptionSummary {
            total_active_subscriptions,
            total_active_mrr,
            details,
        })
    }
}
