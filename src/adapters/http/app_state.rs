use std::sync::Arc;

use crate::{
    application::use_cases::{ingest::IngestUseCases, reports::ReportUseCases},
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ingest_use_cases: Arc<IngestUseCases>,
    pub report_use_cases: Arc<ReportUseCases>,
}
