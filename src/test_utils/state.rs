use std::sync::Arc;

use axum::http::HeaderValue;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        ingest::{IngestStore, IngestUseCases},
        reports::{ReportUseCases, ReportingRepo},
    },
    infra::config::AppConfig,
    test_utils::{InMemoryIngestStore, InMemoryReportingRepo},
};

/// Builds an `AppState` wired entirely to in-memory mocks.
pub fn test_app_state(store: InMemoryIngestStore) -> AppState {
    let config = AppConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        database_url: String::new(),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
    };

    let ingest_use_cases = IngestUseCases::new(Arc::new(store) as Arc<dyn IngestStore>);
    let report_use_cases =
        ReportUseCases::new(Arc::new(InMemoryReportingRepo::default()) as Arc<dyn ReportingRepo>);

    AppState {
        config: Arc::new(config),
        ingest_use_cases: Arc::new(ingest_use_cases),
        report_use_cases: Arc::new(report_use_cases),
    }
}
