//! Shared utilities

pub mod json_dates;
pub mod validation;

pub use json_dates::{normalize_dates, to_normalized_json};
