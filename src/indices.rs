//! Date range to daily index resolution.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

use crate::error::{ExportError, Result};

/// Inclusive range of UTC calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Parse both bounds, discarding any time-of-day after UTC normalisation
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self::new(parse_day(start)?, parse_day(end)?))
    }
}

/// Name of one daily partition, `{namespace}-{YYYY.MM.DD}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexId(String);

impl IndexId {
    pub fn for_day(namespace: &str, day: NaiveDate) -> Self {
        Self(format!("{}-{}", namespace, day.format("%Y.%m.%d")))
    }

    /// Accept a user-supplied index name. The name becomes a file name under
    /// the output directory, so path separators and `.`/`..` are rejected.
    pub fn parse(name: &str) -> Result<Self> {
        check_path_safe("index", name)?;
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reject values that would place an output file outside the output directory
pub fn check_path_safe(what: &str, value: &str) -> Result<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0'])
    {
        return Err(ExportError::Config(format!(
            "invalid {} name '{}': must be non-empty and contain no path separators",
            what, value
        )));
    }
    Ok(())
}

impl From<String> for IndexId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp in any offset.
pub fn parse_day(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    if let Ok(day) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(input)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|e| ExportError::Config(format!("invalid date '{}': {}", input, e)))
}

/// One index per calendar day from `range.start` to `range.end` inclusive.
/// An inverted range yields nothing.
pub fn resolve(range: &DateRange, namespace: &str) -> Vec<IndexId> {
    range
        .start
        .iter_days()
        .take_while(|day| *day <= range.end)
        .map(|day| IndexId::for_day(namespace, day))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn names(ids: &[IndexId]) -> Vec<&str> {
        ids.iter().map(IndexId::as_str).collect()
    }

    #[test]
    fn test_two_day_range() {
        let range = DateRange::new(day(2022, 8, 1), day(2022, 8, 2));
        let ids = resolve(&range, "infra");
        assert_eq!(names(&ids), vec!["infra-2022.08.01", "infra-2022.08.02"]);
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(day(2022, 8, 26), day(2022, 8, 26));
        assert_eq!(
            names(&resolve(&range, "infra-external")),
            vec!["infra-external-2022.08.26"]
        );
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let range = DateRange::new(day(2022, 8, 3), day(2022, 8, 2));
        assert!(resolve(&range, "infra").is_empty());
    }

    #[test]
    fn test_count_and_order_across_month_and_leap_day() {
        let range = DateRange::new(day(2024, 2, 27), day(2024, 3, 2));
        let ids = resolve(&range, "app");
        let expected_len = (range.end - range.start).num_days() + 1;
        assert_eq!(ids.len() as i64, expected_len);
        assert_eq!(
            names(&ids),
            vec![
                "app-2024.02.27",
                "app-2024.02.28",
                "app-2024.02.29",
                "app-2024.03.01",
                "app-2024.03.02",
            ]
        );
        let mut sorted = names(&ids);
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, names(&ids), "Indices should be strictly ascending");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let range = DateRange::new(day(2021, 12, 30), day(2022, 1, 2));
        assert_eq!(resolve(&range, "infra"), resolve(&range, "infra"));
    }

    #[test]
    fn test_parse_day_formats() {
        assert_eq!(parse_day("2022-08-01").unwrap(), day(2022, 8, 1));
        assert_eq!(parse_day(" 2022-08-01 ").unwrap(), day(2022, 8, 1));
        assert_eq!(
            parse_day("2022-08-01T23:30:00Z").unwrap(),
            day(2022, 8, 1),
            "Time of day should be discarded"
        );
        assert_eq!(
            parse_day("2022-08-01T23:30:00-02:00").unwrap(),
            day(2022, 8, 2),
            "Offsets should be normalised to UTC first"
        );
    }

    #[test]
    fn test_index_names_must_stay_inside_output_dir() {
        assert_eq!(
            IndexId::parse("infra-external-2022.08.26").unwrap().as_str(),
            "infra-external-2022.08.26"
        );
        for bad in ["", ".", "..", "../etc/passwd", "a/b", "a\\b", "/abs"] {
            assert!(
                matches!(IndexId::parse(bad), Err(ExportError::Config(_))),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_day_rejects_garbage() {
        assert!(matches!(
            parse_day("yesterday"),
            Err(ExportError::Config(_))
        ));
        assert!(DateRange::parse("2022-08-01", "2022-13-01").is_err());
    }
}
