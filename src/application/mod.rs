pub mod app_error;
pub mod normalizer;
pub mod use_cases;
