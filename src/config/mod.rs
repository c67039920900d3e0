//! Configuration handling for tendersweep
//!
//! A run is configured from two sources:
//! - the CLI query (CPV code, date range, page range), validated here
//! - an optional TOML tuning file for retry/backoff/concurrency knobs
//!
//! Tuning values that the file does not set fall back to conservative
//! bounded defaults.

mod parser;
mod types;
mod validation;

pub use parser::{default_date_range, load_tuning, parse_portal_date};
pub use types::{Query, Tuning};
pub use validation::{validate_query, validate_tuning};
