use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Datetime layouts accepted in the timestamp column, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d.%m.%Y"];

/// Best-effort parse of a raw timestamp cell.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Date label for a set: the parsed timestamp rendered with `format`,
/// or `None` when the cell is not a timestamp or the format is unusable.
pub fn date_label(raw: &str, format: &str) -> Option<String> {
    let ts = parse_timestamp(raw)?;
    let mut out = String::new();
    // An invalid strftime item surfaces as a fmt::Error here instead of a panic.
    write!(out, "{}", ts.format(format)).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_layouts() {
        assert_eq!(
            date_label("2024-03-05 14:22:10", "%d/%m/%Y").as_deref(),
            Some("05/03/2024")
        );
        assert_eq!(
            date_label("2024-03-05T14:22:10Z", "%d/%m/%Y").as_deref(),
            Some("05/03/2024")
        );
        assert_eq!(
            date_label("05/03/2024 14:22", "%Y-%m-%d").as_deref(),
            Some("2024-03-05")
        );
        assert_eq!(date_label("2024-03-05", "%d/%m/%Y").as_deref(), Some("05/03/2024"));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(date_label("", "%d/%m/%Y"), None);
        assert_eq!(date_label("14:22:10", "%d/%m/%Y"), None);
        assert_eq!(date_label("sample 12", "%d/%m/%Y"), None);
    }

    #[test]
    fn test_bad_format_does_not_panic() {
        assert_eq!(date_label("2024-03-05", "%Q"), None);
    }
}
