//! Tendersweep: a batched tender-archive pipeline
//!
//! This crate retrieves public tender records from a government procurement
//! portal, persists per-tender detail pages to a structured local archive, and
//! keeps three downloader stages (app-docs, agency-docs, agreement-docs) in
//! sync through a shared batch ledger written by a leader run and consumed by
//! follower runs.

pub mod archive;
pub mod config;
pub mod extract;
pub mod ledger;
pub mod output;
pub mod pipeline;
pub mod portal;

use thiserror::Error;

/// Main error type for tendersweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error for {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Parse error: {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// All of these are fatal before any network or archive I/O happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid date '{value}': expected DD.MM.YYYY")]
    InvalidDate { value: String },
}

/// Batch-ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("No batch ledger found at {path} (run a leader stage first)")]
    NotFound { path: String },

    #[error("Unsupported ledger schema version {found} (supported: {supported})")]
    SchemaVersion { found: u32, supported: u32 },

    #[error("Ledger checksum mismatch for {path}")]
    ChecksumMismatch { path: String },

    #[error("Malformed ledger at {path}: {message}")]
    Malformed { path: String, message: String },

    #[error("Failed to write ledger: {0}")]
    Write(#[from] std::io::Error),
}

/// Result type alias for tendersweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Query, Tuning};
pub use ledger::{BatchEntry, BatchRecord};
pub use pipeline::{RunMode, StageKind, StageOutcome};
