//! Validation for queries and tuning parameters
//!
//! Everything here runs before any network or archive I/O; a validation
//! failure aborts the run with a `ConfigError`.

use crate::config::types::{Query, Tuning};
use crate::ConfigError;

/// Validates a search query
///
/// Checks:
/// - CPV code is non-empty and numeric
/// - date_from does not come after date_till
/// - page_start is at least 1
/// - a bounded page_end is not below page_start
pub fn validate_query(query: &Query) -> Result<(), ConfigError> {
    if query.cpv_code.trim().is_empty() {
        return Err(ConfigError::Validation("CPV code must not be empty".into()));
    }

    if !query.cpv_code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::Validation(format!(
            "CPV code '{}' must be numeric",
            query.cpv_code
        )));
    }

    if query.date_from > query.date_till {
        return Err(ConfigError::Validation(format!(
            "date range is inverted: {} > {}",
            query.date_from.format("%d.%m.%Y"),
            query.date_till.format("%d.%m.%Y")
        )));
    }

    if query.page_start < 1 {
        return Err(ConfigError::Validation(
            "page-start must be at least 1".into(),
        ));
    }

    if query.page_end != 0 && query.page_end < query.page_start {
        return Err(ConfigError::Validation(format!(
            "page-end {} is below page-start {}",
            query.page_end, query.page_start
        )));
    }

    Ok(())
}

/// Validates tuning parameters
pub fn validate_tuning(tuning: &Tuning) -> Result<(), ConfigError> {
    if tuning.fetch_attempts == 0 {
        return Err(ConfigError::Validation(
            "fetch-attempts must be at least 1".into(),
        ));
    }

    if tuning.page_cap == 0 {
        return Err(ConfigError::Validation(
            "page-cap must be at least 1".into(),
        ));
    }

    if tuning.max_concurrent_harvests == 0 {
        return Err(ConfigError::Validation(
            "max-concurrent-harvests must be at least 1".into(),
        ));
    }

    if tuning.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be at least 1".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn valid_query() -> Query {
        Query {
            cpv_code: "71200000".to_string(),
            date_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            date_till: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            page_start: 1,
            page_end: 0,
        }
    }

    #[test]
    fn test_valid_query_passes() {
        assert!(validate_query(&valid_query()).is_ok());
    }

    #[test]
    fn test_empty_cpv_rejected() {
        let mut query = valid_query();
        query.cpv_code = "".to_string();
        assert!(validate_query(&query).is_err());
    }

    #[test]
    fn test_non_numeric_cpv_rejected() {
        let mut query = valid_query();
        query.cpv_code = "71200000x".to_string();
        assert!(validate_query(&query).is_err());
    }

    #[test]
    fn test_inverted_date_range_rejected() {
        let mut query = valid_query();
        query.date_from = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(validate_query(&query).is_err());
    }

    #[test]
    fn test_page_end_below_page_start_rejected() {
        let mut query = valid_query();
        query.page_start = 5;
        query.page_end = 3;
        assert!(validate_query(&query).is_err());
    }

    #[test]
    fn test_bounded_equal_pages_allowed() {
        let mut query = valid_query();
        query.page_start = 4;
        query.page_end = 4;
        assert!(validate_query(&query).is_ok());
    }

    #[test]
    fn test_zero_page_start_rejected() {
        let mut query = valid_query();
        query.page_start = 0;
        assert!(validate_query(&query).is_err());
    }

    #[test]
    fn test_default_tuning_valid() {
        assert!(validate_tuning(&Tuning::default()).is_ok());
    }

    #[test]
    fn test_zero_page_cap_rejected() {
        let mut tuning = Tuning::default();
        tuning.page_cap = 0;
        assert!(validate_tuning(&tuning).is_err());
    }
}
