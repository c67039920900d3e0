use crate::config::types::Tuning;
use crate::config::validation::validate_tuning;
use crate::ConfigError;
use chrono::{Datelike, Duration, Local, NaiveDate};
use std::path::Path;

/// Date format the portal uses in its search form
const PORTAL_DATE_FORMAT: &str = "%d.%m.%Y";

/// Parses a portal-style `DD.MM.YYYY` date string
///
/// # Arguments
///
/// * `value` - The date string, e.g. "01.01.2025"
///
/// # Returns
///
/// * `Ok(NaiveDate)` - Successfully parsed date
/// * `Err(ConfigError::InvalidDate)` - Malformed or out-of-range date
pub fn parse_portal_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), PORTAL_DATE_FORMAT).map_err(|_| {
        ConfigError::InvalidDate {
            value: value.to_string(),
        }
    })
}

/// Computes the default search window: first day of the previous month
/// through yesterday
pub fn default_date_range() -> (NaiveDate, NaiveDate) {
    default_date_range_from(Local::now().date_naive())
}

/// Deterministic core of [`default_date_range`], split out for testing
fn default_date_range_from(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let date_till = today - Duration::days(1);

    // Step back to the last day of the previous month, then to its first day
    let last_of_prev_month = today.with_day(1).unwrap_or(today) - Duration::days(1);
    let date_from = last_of_prev_month
        .with_day(1)
        .unwrap_or(last_of_prev_month);

    (date_from, date_till)
}

/// Loads the optional tuning file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML tuning file
///
/// # Returns
///
/// * `Ok(Tuning)` - Successfully loaded and validated tuning
/// * `Err(ConfigError)` - Failed to read, parse, or validate the file
pub fn load_tuning(path: &Path) -> Result<Tuning, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let tuning: Tuning = toml::from_str(&content)?;
    validate_tuning(&tuning)?;
    Ok(tuning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_tuning(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_portal_date() {
        let date = parse_portal_date("01.02.2025").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
    }

    #[test]
    fn test_parse_portal_date_trims_whitespace() {
        let date = parse_portal_date("  15.07.2024 ").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
    }

    #[test]
    fn test_parse_portal_date_rejects_iso() {
        let result = parse_portal_date("2025-02-01");
        assert!(matches!(result, Err(ConfigError::InvalidDate { .. })));
    }

    #[test]
    fn test_parse_portal_date_rejects_garbage() {
        assert!(parse_portal_date("99.99.9999").is_err());
        assert!(parse_portal_date("").is_err());
    }

    #[test]
    fn test_default_range_mid_month() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let (from, till) = default_date_range_from(today);
        assert_eq!(from, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(till, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
    }

    #[test]
    fn test_default_range_first_of_january() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let (from, till) = default_date_range_from(today);
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(till, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn test_load_tuning_with_overrides() {
        let file = create_temp_tuning(
            r#"
fetch-attempts = 5
retry-backoff-ms = 100
"#,
        );
        let tuning = load_tuning(file.path()).unwrap();
        assert_eq!(tuning.fetch_attempts, 5);
        assert_eq!(tuning.retry_backoff_ms, 100);
        // Unset fields keep their defaults
        assert_eq!(tuning.page_cap, 500);
        assert_eq!(tuning.max_concurrent_harvests, 4);
    }

    #[test]
    fn test_load_tuning_missing_file() {
        let result = load_tuning(Path::new("/nonexistent/tuning.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_tuning_invalid_toml() {
        let file = create_temp_tuning("not valid toml {{{");
        assert!(matches!(
            load_tuning(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_tuning_rejects_zero_attempts() {
        let file = create_temp_tuning("fetch-attempts = 0");
        assert!(matches!(
            load_tuning(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }
}
