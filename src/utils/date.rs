use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::consts::DATE_FORMAT;
use crate::error::AppError;

use super::Timezone;

/// Parse a CLI date argument (YYYYMMDD or YYYY-MM-DD)
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    let s = s.trim();
    if s.len() == 8
        && let Ok(d) = NaiveDate::parse_from_str(s, "%Y%m%d")
    {
        return Ok(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Ok(d);
    }
    Err(AppError::InvalidDate {
        input: s.to_string(),
    })
}

/// Parse a timestamp column as returned by PostgREST
///
/// Accepts RFC 3339, the space-separated Postgres rendering with short
/// offsets ("+00"), and offset-less timestamps which are taken as UTC.
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Calendar day of a stored date or timestamp column
///
/// A bare `YYYY-MM-DD` value is already a calendar day and is not shifted;
/// timestamps are converted into `tz` first.
pub(crate) fn parse_record_date(value: Option<&str>, tz: Timezone) -> Option<NaiveDate> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() == 10
        && let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
    {
        return Some(date);
    }
    parse_timestamp(trimmed).map(|utc| tz.date_of(utc))
}

/// Human label such as "Feb 3, 2026", or "Not set"
pub(crate) fn format_date_label(value: Option<&str>, tz: Timezone) -> String {
    match parse_record_date(value, tz) {
        Some(date) => date.format("%b %-d, %Y").to_string(),
        None => "Not set".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const UTC: Timezone = Timezone::Named(chrono_tz::UTC);

    #[test]
    fn parse_date_accepts_both_forms() {
        assert_eq!(parse_date("20260203").unwrap(), d(2026, 2, 3));
        assert_eq!(parse_date("2026-02-03").unwrap(), d(2026, 2, 3));
        assert_eq!(parse_date(" 2026-02-03 ").unwrap(), d(2026, 2, 3));
    }

    #[test]
    fn parse_date_rejects_garbage() {
        let err = parse_date("02/03/2026").unwrap_err();
        assert!(err.to_string().contains("02/03/2026"));
        assert!(parse_date("20261399").is_err());
    }

    #[test]
    fn parse_timestamp_rfc3339_variants() {
        let expected = "2026-02-05T15:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(parse_timestamp("2026-02-05T15:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2026-02-05T15:00:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-02-05T16:00:00+01:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2026-02-05T15:00:00.123456+00:00").map(|t| t.timestamp()),
            Some(expected.timestamp())
        );
    }

    #[test]
    fn parse_timestamp_postgres_rendering() {
        let expected = "2026-02-05T15:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(parse_timestamp("2026-02-05 15:00:00+00"), Some(expected));
        assert_eq!(parse_timestamp("2026-02-05 15:00:00"), Some(expected));
    }

    #[test]
    fn parse_timestamp_invalid() {
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn record_date_only_is_not_shifted() {
        let ny = Timezone::parse(Some("America/New_York")).unwrap();
        assert_eq!(parse_record_date(Some("2026-02-03"), ny), Some(d(2026, 2, 3)));
    }

    #[test]
    fn record_timestamp_uses_timezone() {
        let ny = Timezone::parse(Some("America/New_York")).unwrap();
        assert_eq!(
            parse_record_date(Some("2026-02-10T02:00:00Z"), ny),
            Some(d(2026, 2, 9))
        );
        assert_eq!(
            parse_record_date(Some("2026-02-10T02:00:00Z"), UTC),
            Some(d(2026, 2, 10))
        );
    }

    #[test]
    fn record_date_empty_or_invalid() {
        assert_eq!(parse_record_date(None, UTC), None);
        assert_eq!(parse_record_date(Some("   "), UTC), None);
        assert_eq!(parse_record_date(Some("soon"), UTC), None);
    }

    #[test]
    fn date_label_formatting() {
        assert_eq!(format_date_label(Some("2026-02-03"), UTC), "Feb 3, 2026");
        assert_eq!(
            format_date_label(Some("2025-12-14T10:00:00Z"), UTC),
            "Dec 14, 2025"
        );
        assert_eq!(format_date_label(None, UTC), "Not set");
        assert_eq!(format_date_label(Some("bad"), UTC), "Not set");
    }
}
