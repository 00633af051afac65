use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        ingest::{IngestStore, IngestUseCases},
        reports::{ReportUseCases, ReportingRepo},
    },
    infra::{config::AppConfig, postgres_persistence},
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let ingest_use_cases = IngestUseCases::new(postgres_arc.clone() as Arc<dyn IngestStore>);
    let report_use_cases = ReportUseCases::new(postgres_arc.clone() as Arc<dyn ReportingRepo>);

    Ok(AppState {
        config: Arc::new(config),
        ingest_use_cases: Arc::new(ingest_use_cases),
        report_use_cases: Arc::new(report_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stripe_ingest=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
