//! Test utilities for engine and route tests.
//!
//! This module provides:
//! - An in-memory transactional store standing in for Postgres
//! - An in-memory reporting repository
//! - A builder for an `AppState` wired entirely to the in-memory mocks

mod ingest_mocks;
mod reporting_mocks;
mod state;

pub use ingest_mocks::*;
pub use reporting_mocks::*;
pub use state::*;
