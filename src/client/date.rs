//! Display formatting for API timestamps

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offsets without the RFC 3339 colon (`+0800`) or minutes (`+08`)
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
];

/// Render a timestamp as `YYYY-MM-DD`.
///
/// The calendar date is taken as written, whether the string ends in `Z`,
/// a numeric offset or nothing. Unparseable input is returned unchanged.
pub fn format_date(timestamp: &str) -> String {
    let trimmed = timestamp.trim();

    let date = DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| {
            OFFSET_FORMATS
                .iter()
                .find_map(|fmt| DateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date_naive())
        })
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok())
        .or_else(|| leading_date(trimmed));

    match date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => timestamp.to_string(),
    }
}

/// Date part of `YYYY-MM-DD[T ]...` when the rest is in some other notation
fn leading_date(trimmed: &str) -> Option<NaiveDate> {
    let (head, rest) = (trimmed.get(..10)?, trimmed.get(10..)?);
    if !rest.starts_with(['T', ' ']) {
        return None;
    }
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_notations() {
        assert_eq!(format_date("2024-03-05T10:20:30Z"), "2024-03-05");
        assert_eq!(format_date("2024-03-05T23:59:59+08:00"), "2024-03-05");
        assert_eq!(format_date("2024-03-05T00:00:01-05:00"), "2024-03-05");
        assert_eq!(format_date("2024-03-05T10:20:30"), "2024-03-05");
        assert_eq!(format_date("2024-03-05T10:20:30.123456789Z"), "2024-03-05");
        assert_eq!(format_date("2024-03-05T10:20:30+0800"), "2024-03-05");
        assert_eq!(format_date("2024-03-05T10:20:30.000+0800"), "2024-03-05");
        assert_eq!(format_date("2024-03-05T10:20:30+08"), "2024-03-05");
        assert_eq!(format_date("2024-03-05 23:10:00-0330"), "2024-03-05");
        assert_eq!(format_date("2024-03-05T10:20:30 GMT+0800"), "2024-03-05");
    }

    #[test]
    fn test_other_shapes() {
        assert_eq!(format_date("2024-12-31 08:00:00"), "2024-12-31");
        assert_eq!(format_date("2024-01-02"), "2024-01-02");
        assert_eq!(format_date("yesterday"), "yesterday");
        assert_eq!(format_date(""), "");
    }
}
