//! In-memory mock of the reporting repository.

use async_trait::async_trait;

use crate::{
    app_error::AppResult,
    application::use_cases::reports::{MrrReportRow, ReportingRepo, StatusBreakdown},
    domain::entities::{history::SubscriptionHistoryEntry, raw_event::RawEvent},
};

#[derive(Default)]
pub struct InMemoryReportingRepo {
    pub raw_events: Vec<RawEvent>,
    pub history: Vec<SubscriptionHistoryEntry>,
    pub breakdown: Vec<StatusBreakdown>,
}

#[async_trait]
impl ReportingRepo for InMemoryReportingRepo {
    async fn list_raw_events(&self) -> AppResult<Vec<RawEvent>> {
        Ok(self.raw_events.clone())
    }

    async fn customer_history(
        &self,
        _customer_id: &str,
    ) -> AppResult<Vec<SubscriptionHistoryEntry>> {
        Ok(self.history.clone())
    }

    // Period aggregation lives in SQL; the mock has no ledger to roll up.
    async fn monthly_mrr(&self) -> AppResult<Vec<MrrReportRow>> {
        Ok(Vec::new())
    }

    async fn yearly_mrr(&self) -> AppResult<Vec<MrrReportRow>> {
        Ok(Vec::new())
    }

    async fn status_breakdown(&self) -> AppResult<Vec<StatusBreakdown>> {
        Ok(self.breakdown.clone())
    }
}
