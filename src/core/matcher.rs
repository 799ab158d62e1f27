use crate::domain::model::{MonthDay, ParsedBirthday};
use chrono::format::{self, Item, Numeric, Parsed, StrftimeItems};
use chrono::NaiveDate;
use std::iter;
use thiserror::Error;

/// Formats tried when the configuration does not list any, in priority order.
pub const DEFAULT_DATE_FORMATS: [&str; 5] = ["%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d", "%Y-%m-%d", "%m/%d"];

/// Leap year used to validate dates parsed without a year, so Feb 29 is accepted.
const REFERENCE_LEAP_YEAR: i32 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{raw}' does not match any supported date format")]
pub struct ParseFailure {
    pub raw: String,
}

/// One strftime-style pattern, tried as a single parse attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
}

impl DateFormat {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The pattern compiles and names both a month and a day.
    pub fn is_usable(&self) -> bool {
        let items: Vec<Item<'_>> = StrftimeItems::new(&self.pattern).collect();
        !items.iter().any(|item| matches!(item, Item::Error))
            && self.pattern.contains("%m")
            && self.pattern.contains("%d")
    }

    /// Parses the whole input or nothing; trailing characters fail the attempt.
    ///
    /// `%Y` must be exactly four digits. chrono alone would take `90` as the
    /// year 90.
    pub fn attempt(&self, raw: &str) -> Option<ParsedBirthday> {
        let mut parsed = Parsed::new();
        let mut rest = raw;
        for item in StrftimeItems::new(&self.pattern) {
            let full_year = matches!(item, Item::Numeric(Numeric::Year, _));
            let remainder = format::parse_and_remainder(&mut parsed, rest, iter::once(item)).ok()?;
            if full_year && !is_four_digit_year(&rest[..rest.len() - remainder.len()]) {
                return None;
            }
            rest = remainder;
        }
        if !rest.is_empty() {
            return None;
        }

        let month = parsed.month()?;
        let day = parsed.day()?;
        let year = parsed.year();

        NaiveDate::from_ymd_opt(year.unwrap_or(REFERENCE_LEAP_YEAR), month, day)?;

        Some(ParsedBirthday { month, day, year })
    }
}

fn is_four_digit_year(consumed: &str) -> bool {
    let digits = consumed.trim_start();
    digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Decides whether a birthday string falls on a given month and day.
#[derive(Debug, Clone)]
pub struct BirthdayMatcher {
    formats: Vec<DateFormat>,
}

impl Default for BirthdayMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMATS.iter().map(|p| DateFormat::new(*p)).collect())
    }
}

impl BirthdayMatcher {
    pub fn new(formats: Vec<DateFormat>) -> Self {
        Self { formats }
    }

    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self::new(patterns.iter().map(|p| DateFormat::new(p.as_ref())).collect())
    }

    pub fn formats(&self) -> &[DateFormat] {
        &self.formats
    }

    /// First format that parses the trimmed input wins.
    pub fn parse(&self, birthday_raw: &str) -> Result<ParsedBirthday, ParseFailure> {
        let trimmed = birthday_raw.trim();
        if !trimmed.is_empty() {
            for date_format in &self.formats {
                if let Some(parsed) = date_format.attempt(trimmed) {
                    tracing::trace!("Parsed '{}' with '{}'", trimmed, date_format.pattern());
                    return Ok(parsed);
                }
            }
        }

        Err(ParseFailure {
            raw: birthday_raw.to_string(),
        })
    }

    /// Compares month and day only; the year never participates.
    pub fn matches(parsed: &ParsedBirthday, today: MonthDay) -> bool {
        parsed.month == today.month && parsed.day == today.day
    }

    pub fn matches_today(&self, birthday_raw: &str, today: MonthDay) -> bool {
        self.parse(birthday_raw)
            .map(|parsed| Self::matches(&parsed, today))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn april_15() -> MonthDay {
        MonthDay::new(4, 15)
    }

    #[test]
    fn test_each_default_format() {
        let matcher = BirthdayMatcher::default();
        for raw in ["04/15/1990", "04-15-1990", "1990/04/15", "1990-04-15", "04/15", "4/15"] {
            let parsed = matcher.parse(raw).unwrap();
            assert_eq!((parsed.month, parsed.day), (4, 15), "input {}", raw);
            assert!(matcher.matches_today(raw, april_15()), "input {}", raw);
        }
    }

    #[test]
    fn test_year_is_informational() {
        let matcher = BirthdayMatcher::default();
        assert_eq!(matcher.parse("04/15/1990").unwrap().year, Some(1990));
        assert_eq!(matcher.parse("04/15").unwrap().year, None);
        assert!(matcher.matches_today("04/15/2099", april_15()));
    }

    #[test]
    fn test_first_successful_format_wins() {
        // Ambiguous under both orders: month-first must win.
        let matcher = BirthdayMatcher::from_patterns(&["%m/%d/%Y", "%d/%m/%Y"]);
        let parsed = matcher.parse("03/04/2001").unwrap();
        assert_eq!((parsed.month, parsed.day), (3, 4));

        let swapped = BirthdayMatcher::from_patterns(&["%d/%m/%Y", "%m/%d/%Y"]);
        let parsed = swapped.parse("03/04/2001").unwrap();
        assert_eq!((parsed.month, parsed.day), (4, 3));
    }

    #[test]
    fn test_trailing_characters_fail_attempt() {
        let only_short = BirthdayMatcher::from_patterns(&["%m/%d"]);
        assert!(only_short.parse("04/15/1990").is_err());
        assert!(only_short.parse("04/15x").is_err());

        let matcher = BirthdayMatcher::default();
        assert!(matcher.parse("04/15/1990 extra").is_err());
    }

    #[test]
    fn test_out_of_range_is_unparseable() {
        let matcher = BirthdayMatcher::default();
        assert_eq!(
            matcher.parse("13/40/2000"),
            Err(ParseFailure {
                raw: "13/40/2000".to_string()
            })
        );
        assert!(matcher.parse("").is_err());
        assert!(matcher.parse("next tuesday").is_err());
        assert!(!matcher.matches_today("13/40/2000", april_15()));
    }

    #[test]
    fn test_short_years_are_unparseable() {
        let matcher = BirthdayMatcher::default();
        assert!(matcher.parse("04/15/90").is_err());
        assert!(matcher.parse("12-10-05").is_err());
        assert!(matcher.parse("90/04/15").is_err());
        assert!(matcher.parse("4/15/1990").is_ok());
        assert!(!matcher.matches_today("04/15/90", april_15()));
    }

    #[test]
    fn test_leap_day_is_strict() {
        let matcher = BirthdayMatcher::default();
        assert!(!matcher.matches_today("02/29", MonthDay::new(2, 28)));
        assert!(!matcher.matches_today("02/29", MonthDay::new(3, 1)));
        assert!(matcher.matches_today("02/29", MonthDay::new(2, 29)));
        assert!(matcher.matches_today("02/29/2000", MonthDay::new(2, 29)));
    }

    #[test]
    fn test_impossible_calendar_date_with_year() {
        let matcher = BirthdayMatcher::default();
        assert!(matcher.parse("02/29/1999").is_err());
        assert!(matcher.parse("04/31").is_err());
    }

    #[test]
    fn test_agrees_with_manual_extraction() {
        let matcher = BirthdayMatcher::default();
        for month in 1..=12u32 {
            for day in [1u32, 9, 10, 28] {
                let raw = format!("{}-{:02}-{:02}", 1985, month, day);
                let parsed = matcher.parse(&raw).unwrap();
                assert_eq!((parsed.month, parsed.day), (month, day));
                assert!(matcher.matches_today(&raw, MonthDay::new(month, day)));
                assert!(!matcher.matches_today(&raw, MonthDay::new(month % 12 + 1, day)));
            }
        }
    }

    #[test]
    fn test_format_usability() {
        assert!(DateFormat::new("%m/%d/%Y").is_usable());
        assert!(!DateFormat::new("%Y-%m").is_usable());
        assert!(!DateFormat::new("%m/%d %Q").is_usable());
    }
}
