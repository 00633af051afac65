pub mod ingest;
pub mod reports;
