use chrono::NaiveDate;
use thiserror::Error;

use tally_core::DateFormat;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("empty date")]
    Empty,
    #[error("unreadable date '{0}'")]
    Malformed(String),
    #[error("'{0}' is not a calendar date")]
    NotACalendarDate(String),
    #[error("year {0} is outside 1900-2100")]
    YearOutOfRange(i64),
}

/// Parse a raw date cell according to the mapped format. Failures are
/// values: the caller decides whether to count them.
pub fn parse_date(raw: &str, format: DateFormat) -> Result<NaiveDate, DateParseError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(DateParseError::Empty);
    }

    let (year, month, day) = match format {
        DateFormat::YmdDash => delimited(s, '-', FieldOrder::Ymd),
        DateFormat::DmyDash => delimited(s, '-', FieldOrder::Dmy),
        DateFormat::MdyDash => delimited(s, '-', FieldOrder::Mdy),
        DateFormat::DmySlash => delimited(s, '/', FieldOrder::Dmy),
        DateFormat::MdySlash => delimited(s, '/', FieldOrder::Mdy),
        DateFormat::YmdCompact => compact(s, 0..4, 4..6, 6..8),
        DateFormat::DmyCompact => compact(s, 4..8, 2..4, 0..2),
        DateFormat::MdyCompact => compact(s, 4..8, 0..2, 2..4),
    }
    .ok_or_else(|| DateParseError::Malformed(s.to_string()))?;

    if !(1900..=2100).contains(&year) {
        return Err(DateParseError::YearOutOfRange(year));
    }

    let month = u32::try_from(month).map_err(|_| DateParseError::NotACalendarDate(s.to_string()))?;
    let day = u32::try_from(day).map_err(|_| DateParseError::NotACalendarDate(s.to_string()))?;
    NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| DateParseError::NotACalendarDate(s.to_string()))
}

enum FieldOrder {
    Ymd,
    Dmy,
    Mdy,
}

/// First three numeric components, split on the format's own delimiter.
/// Components past the third are ignored.
fn delimited(s: &str, delim: char, order: FieldOrder) -> Option<(i64, i64, i64)> {
    let mut parts = s.split(delim);
    let a = parts.next()?.trim().parse::<i64>().ok()?;
    let b = parts.next()?.trim().parse::<i64>().ok()?;
    let c = parts.next()?.trim().parse::<i64>().ok()?;
    Some(match order {
        FieldOrder::Ymd => (a, b, c),
        FieldOrder::Dmy => (c, b, a),
        FieldOrder::Mdy => (c, a, b),
    })
}

/// Fixed-offset slices; trailing characters past offset 8 are ignored.
fn compact(
    s: &str,
    year: std::ops::Range<usize>,
    month: std::ops::Range<usize>,
    day: std::ops::Range<usize>,
) -> Option<(i64, i64, i64)> {
    let slice = |r: std::ops::Range<usize>| s.get(r).and_then(|p| p.parse::<i64>().ok());
    Some((slice(year)?, slice(month)?, slice(day)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn iso_dash() {
        assert_eq!(parse_date("2024-03-05", DateFormat::YmdDash).unwrap(), date(2024, 3, 5));
    }

    #[test]
    fn day_first_dash() {
        assert_eq!(parse_date("05-03-2024", DateFormat::DmyDash).unwrap(), date(2024, 3, 5));
    }

    #[test]
    fn month_first_dash() {
        assert_eq!(parse_date("03-05-2024", DateFormat::MdyDash).unwrap(), date(2024, 3, 5));
    }

    #[test]
    fn slash_variants() {
        assert_eq!(parse_date("05/03/2024", DateFormat::DmySlash).unwrap(), date(2024, 3, 5));
        assert_eq!(parse_date("03/05/2024", DateFormat::MdySlash).unwrap(), date(2024, 3, 5));
    }

    #[test]
    fn compact_variants() {
        assert_eq!(parse_date("20240305", DateFormat::YmdCompact).unwrap(), date(2024, 3, 5));
        assert_eq!(parse_date("05032024", DateFormat::DmyCompact).unwrap(), date(2024, 3, 5));
        assert_eq!(parse_date("03052024", DateFormat::MdyCompact).unwrap(), date(2024, 3, 5));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(parse_date("  2024-01-15 ", DateFormat::YmdDash).unwrap(), date(2024, 1, 15));
    }

    #[test]
    fn empty_is_a_distinct_failure() {
        assert_eq!(parse_date("", DateFormat::YmdDash), Err(DateParseError::Empty));
        assert_eq!(parse_date("   ", DateFormat::YmdDash), Err(DateParseError::Empty));
    }

    #[test]
    fn feb_31_is_rejected() {
        assert!(matches!(
            parse_date("31-02-2024", DateFormat::DmyDash),
            Err(DateParseError::NotACalendarDate(_))
        ));
    }

    #[test]
    fn leap_day_only_in_leap_years() {
        assert!(parse_date("2024-02-29", DateFormat::YmdDash).is_ok());
        assert!(parse_date("2023-02-29", DateFormat::YmdDash).is_err());
    }

    #[test]
    fn year_window_is_inclusive() {
        assert!(parse_date("1900-01-01", DateFormat::YmdDash).is_ok());
        assert!(parse_date("2100-12-31", DateFormat::YmdDash).is_ok());
        assert_eq!(
            parse_date("1899-12-31", DateFormat::YmdDash),
            Err(DateParseError::YearOutOfRange(1899))
        );
        assert_eq!(
            parse_date("2101-01-01", DateFormat::YmdDash),
            Err(DateParseError::YearOutOfRange(2101))
        );
    }

    #[test]
    fn wrong_delimiter_is_malformed() {
        assert!(matches!(
            parse_date("2024/03/05", DateFormat::YmdDash),
            Err(DateParseError::Malformed(_))
        ));
    }

    #[test]
    fn missing_components_are_malformed() {
        assert!(matches!(
            parse_date("2024-03", DateFormat::YmdDash),
            Err(DateParseError::Malformed(_))
        ));
        assert!(matches!(
            parse_date("202403", DateFormat::YmdCompact),
            Err(DateParseError::Malformed(_))
        ));
    }

    #[test]
    fn month_zero_is_not_a_calendar_date() {
        assert!(matches!(
            parse_date("2024-00-10", DateFormat::YmdDash),
            Err(DateParseError::NotACalendarDate(_))
        ));
    }
}
