use chrono::{DateTime, NaiveDate, Utc};

/// Parse the timestamp shapes ATProto records carry: RFC3339 with either a
/// `Z` suffix or an explicit offset, or a bare `YYYY-MM-DD` date. Bare dates
/// are interpreted as midnight UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    None
}

/// End-of-day expansion for naive date bounds: `2024-05-01` becomes
/// `2024-05-01T23:59:59.999999Z` so inclusive date ranges behave as users
/// expect.
pub fn parse_end_of_day(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    parse_datetime(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_datetime_zulu() {
        let dt = parse_datetime("2024-11-13T23:19:36.449Z").unwrap();
        assert_eq!(dt.hour(), 23);
    }

    #[test]
    fn test_parse_datetime_bare_date() {
        let dt = parse_datetime("2024-05-01").unwrap();
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt.minute(), 0);
    }

    #[test]
    fn test_parse_end_of_day_expands() {
        let dt = parse_end_of_day("2024-05-01").unwrap();
        assert_eq!(dt.hour(), 23);
        assert_eq!(dt.second(), 59);
    }

    #[test]
    fn test_parse_datetime_garbage() {
        assert!(parse_datetime("not a date").is_none());
        assert!(parse_datetime("").is_none());
    }
}
