use chrono::NaiveDate;
use serde::Deserialize;

/// Search query for one pipeline run
///
/// Immutable once built; every page the walker fetches uses the same CPV code
/// and date window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// CPV classification code, e.g. "71200000"
    pub cpv_code: String,

    /// First announcement date included in the search
    pub date_from: NaiveDate,

    /// Last announcement date included in the search
    pub date_till: NaiveDate,

    /// First result page to process (1-based)
    pub page_start: u32,

    /// Last result page to process inclusive; 0 means "until the portal
    /// reports no more results"
    pub page_end: u32,
}

impl Query {
    /// Whether the walk has no fixed upper page bound
    pub fn is_unbounded(&self) -> bool {
        self.page_end == 0
    }
}

/// Tunable pipeline parameters, loadable from an optional TOML file
///
/// The original portal does not document retry limits or page counts, so all
/// of these are bounded defaults that a tuning file may override.
#[derive(Debug, Clone, Deserialize)]
pub struct Tuning {
    /// Attempts per page or per detail tab before it is recorded as skipped
    #[serde(rename = "fetch-attempts", default = "default_fetch_attempts")]
    pub fetch_attempts: u32,

    /// Fixed delay between retry attempts, in milliseconds
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Hard cap on pages visited in unbounded mode, guarding against a
    /// misbehaving portal that never reports an empty page
    #[serde(rename = "page-cap", default = "default_page_cap")]
    pub page_cap: u32,

    /// Maximum number of tenders harvested concurrently
    #[serde(rename = "max-concurrent-harvests", default = "default_max_concurrent_harvests")]
    pub max_concurrent_harvests: u32,

    /// Total request timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_fetch_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_page_cap() -> u32 {
    500
}

fn default_max_concurrent_harvests() -> u32 {
    4
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            fetch_attempts: default_fetch_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            page_cap: default_page_cap(),
            max_concurrent_harvests: default_max_concurrent_harvests(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning_is_bounded() {
        let tuning = Tuning::default();
        assert!(tuning.fetch_attempts >= 1);
        assert!(tuning.page_cap >= 1);
        assert!(tuning.max_concurrent_harvests >= 1);
    }

    #[test]
    fn test_query_unbounded() {
        let query = Query {
            cpv_code: "71200000".to_string(),
            date_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            date_till: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            page_start: 1,
            page_end: 0,
        };
        assert!(query.is_unbounded());
    }
}
