//! Date and location line formatting

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::domain::{DateFormat, LocationFormat};

/// English ordinal suffix; 11-13 always take "th".
pub fn ordinal_suffix(day: u32) -> &'static str {
    match day % 100 {
        11..=13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    }
}

/// Parse the feed's ISO-ish start timestamp down to a calendar date.
///
/// The feed is not strict about offsets, so this walks RFC 3339, offset-less
/// datetime forms, then a bare date.
pub fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Render the date line.
///
/// Unparseable timestamps fall back to the raw string verbatim. The
/// uppercase-month flag touches only the month token; a line-level
/// uppercase flag, applied later by the text builder, uppercases the whole
/// result.
pub fn format_event_date(
    raw: &str,
    format: DateFormat,
    ordinal: bool,
    uppercase_month: bool,
) -> String {
    let date = match parse_start_date(raw) {
        Some(date) => date,
        None => return raw.trim().to_string(),
    };

    let day = date.day();
    let suffix = if ordinal { ordinal_suffix(day) } else { "" };

    let month = match format {
        DateFormat::Short => date.format("%b").to_string(),
        DateFormat::Long | DateFormat::Full => date.format("%B").to_string(),
    };
    let month = if uppercase_month {
        month.to_uppercase()
    } else {
        month
    };

    match format {
        DateFormat::Short => format!("{}{} {}", day, suffix, month),
        DateFormat::Long => format!("{}{} {} {}", day, suffix, month, date.year()),
        DateFormat::Full => format!(
            "{}, {}{} {} {}",
            date.format("%A"),
            day,
            suffix,
            month,
            date.year()
        ),
    }
}

/// Render the location per the configured mode, dropping blank parts
/// instead of emitting dangling separators.
pub fn format_location(city: &str, state: &str, country: &str, format: LocationFormat) -> String {
    let city = city.trim();
    let state = state.trim();
    let country = country.trim();

    let second = match format {
        LocationFormat::City => "",
        LocationFormat::CityState => {
            if state.is_empty() {
                country
            } else {
                state
            }
        }
        LocationFormat::CityCountry => country,
    };

    join_parts(city, second)
}

/// Merge venue and location into one line joined by ", ". `None` when both
/// are absent, so the caller emits no line at all.
pub fn merge_venue_location(venue: Option<&str>, location: Option<&str>) -> Option<String> {
    let venue = venue.map(str::trim).filter(|v| !v.is_empty());
    let location = location.map(str::trim).filter(|l| !l.is_empty());

    match (venue, location) {
        (Some(v), Some(l)) => Some(format!("{}, {}", v, l)),
        (Some(v), None) => Some(v.to_string()),
        (None, Some(l)) => Some(l.to_string()),
        (None, None) => None,
    }
}

fn join_parts(first: &str, second: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (false, false) => format!("{}, {}", first, second),
        (false, true) => first.to_string(),
        (true, false) => second.to_string(),
        (true, true) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Wednesday, 5 February 2025
    const STARTS_AT: &str = "2025-02-05T20:00:00";

    #[test]
    fn test_short_plain() {
        assert_eq!(
            format_event_date(STARTS_AT, DateFormat::Short, false, false),
            "5 Feb"
        );
    }

    #[test]
    fn test_short_ordinal_uppercase_month() {
        assert_eq!(
            format_event_date(STARTS_AT, DateFormat::Short, true, true),
            "5th FEB"
        );
    }

    #[test]
    fn test_long_with_and_without_ordinal() {
        assert_eq!(
            format_event_date(STARTS_AT, DateFormat::Long, true, false),
            "5th February 2025"
        );
        assert_eq!(
            format_event_date(STARTS_AT, DateFormat::Long, false, false),
            "5 February 2025"
        );
    }

    #[test]
    fn test_full_with_ordinal() {
        assert_eq!(
            format_event_date(STARTS_AT, DateFormat::Full, true, false),
            "Wednesday, 5th February 2025"
        );
    }

    #[test]
    fn test_unparseable_falls_back_to_raw() {
        assert_eq!(
            format_event_date("doors at 8", DateFormat::Long, true, false),
            "doors at 8"
        );
    }

    #[test]
    fn test_rfc3339_with_offset_parses() {
        assert_eq!(
            format_event_date("2025-02-05T20:00:00+02:00", DateFormat::Short, false, false),
            "5 Feb"
        );
    }

    #[test]
    fn test_ordinal_suffixes() {
        assert_eq!(ordinal_suffix(1), "st");
        assert_eq!(ordinal_suffix(2), "nd");
        assert_eq!(ordinal_suffix(3), "rd");
        assert_eq!(ordinal_suffix(4), "th");
        assert_eq!(ordinal_suffix(11), "th");
        assert_eq!(ordinal_suffix(12), "th");
        assert_eq!(ordinal_suffix(13), "th");
        assert_eq!(ordinal_suffix(21), "st");
        assert_eq!(ordinal_suffix(22), "nd");
        assert_eq!(ordinal_suffix(23), "rd");
        assert_eq!(ordinal_suffix(111), "th");
    }

    #[test]
    fn test_location_table() {
        assert_eq!(
            format_location("Austin", "TX", "USA", LocationFormat::City),
            "Austin"
        );
        assert_eq!(
            format_location("Austin", "TX", "USA", LocationFormat::CityState),
            "Austin, TX"
        );
        assert_eq!(
            format_location("Austin", "", "USA", LocationFormat::CityState),
            "Austin, USA"
        );
        assert_eq!(
            format_location("Austin", "TX", "USA", LocationFormat::CityCountry),
            "Austin, USA"
        );
    }

    #[test]
    fn test_location_blank_city() {
        assert_eq!(
            format_location("", "TX", "USA", LocationFormat::CityState),
            "TX"
        );
    }

    #[test]
    fn test_venue_location_merge() {
        assert_eq!(
            merge_venue_location(Some("Main Stage Arena"), Some("Austin, TX")),
            Some("Main Stage Arena, Austin, TX".to_string())
        );
        assert_eq!(
            merge_venue_location(Some("Main Stage Arena"), None),
            Some("Main Stage Arena".to_string())
        );
        assert_eq!(merge_venue_location(None, None), None);
        assert_eq!(merge_venue_location(Some("  "), None), None);
    }
}
