//! Free-text date parsing.
//!
//! Formats are attempted in order of specificity, first match wins:
//! ISO, numeric with month/day disambiguation, day-then-month-name,
//! month-name-then-day. Every candidate is validated by reconstructing
//! a proleptic Gregorian date (so Feb 30 is rejected, not wrapped) and
//! range-checked to the supported window.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Earliest supported year.
pub const MIN_YEAR: i32 = 1800;

/// Latest supported year.
pub const MAX_YEAR: i32 = 2200;

/// Two-digit years at or below this pivot resolve to the 2000s;
/// above it, to the 1900s.
pub const TWO_DIGIT_PIVOT: u32 = 30;

/// Which grammar matched a raw date string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePattern {
    /// `YYYY-MM-DD` (also with `/`).
    Iso,
    /// `N/N/N` with a 2–4 digit year.
    Numeric,
    /// `15-Mar-2024`, `15 March 2024`.
    DayMonthName,
    /// `March 15, 2024`.
    MonthNameDay,
    /// Nothing matched.
    None,
}

/// Outcome of parsing one raw date substring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateParseResult {
    /// The resolved date, or `None` when the text cannot be anchored.
    pub date: Option<NaiveDate>,

    /// ISO rendering of the resolved date; empty on failure.
    pub normalized_iso: String,

    /// Which grammar matched.
    pub pattern: DatePattern,

    /// Disambiguation note or failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl DateParseResult {
    fn resolved(date: NaiveDate, pattern: DatePattern, warning: Option<String>) -> Self {
        DateParseResult {
            normalized_iso: date.format("%Y-%m-%d").to_string(),
            date: Some(date),
            pattern,
            warning,
        }
    }

    fn unresolved(pattern: DatePattern, reason: impl Into<String>) -> Self {
        DateParseResult {
            date: None,
            normalized_iso: String::new(),
            pattern,
            warning: Some(reason.into()),
        }
    }
}

static ISO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})$").unwrap());

static NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[-/](\d{1,2})[-/](\d{2,4})$").unwrap());

static DAY_MONTH_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[-\s]([A-Za-z]{3,9})\.?[-\s,]\s*(\d{2,4})$").unwrap()
});

static MONTH_NAME_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]{3,9})\.?\s+(\d{1,2})(?:\s*,?\s*(\d{4}))?$").unwrap()
});

/// Parse a raw date substring.
///
/// On failure the result carries `date: None` and a reason; callers must
/// treat that as "cannot anchor" and fall back to a non-reversible
/// redaction marker, never to leaving the raw text in output.
pub fn parse_date(raw: &str) -> DateParseResult {
    let trimmed = strip_surrounds(raw);
    if trimmed.is_empty() {
        return DateParseResult::unresolved(DatePattern::None, "empty date text");
    }

    if let Some(caps) = ISO.captures(trimmed) {
        let year: i32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let day: u32 = caps[3].parse().unwrap_or(0);
        return validate(year, month, day, DatePattern::Iso, None);
    }

    if let Some(caps) = NUMERIC.captures(trimmed) {
        let first: u32 = caps[1].parse().unwrap_or(0);
        let second: u32 = caps[2].parse().unwrap_or(0);
        let year_text = &caps[3];
        let year = match resolve_year(year_text) {
            Ok(y) => y,
            Err(reason) => return DateParseResult::unresolved(DatePattern::Numeric, reason),
        };
        let (month, day, warning) = if first > 12 && second <= 12 {
            (second, first, Some("interpreted as D/M".to_string()))
        } else if first <= 12 && second <= 12 {
            (
                first,
                second,
                Some("ambiguous; interpreted as M/D".to_string()),
            )
        } else if first <= 12 {
            // second > 12 can only be a day, so month/day is unambiguous
            (first, second, None)
        } else {
            return DateParseResult::unresolved(
                DatePattern::Numeric,
                "neither component can be a month",
            );
        };
        return validate(year, month, day, DatePattern::Numeric, warning);
    }

    if let Some(caps) = DAY_MONTH_NAME.captures(trimmed) {
        let day: u32 = caps[1].parse().unwrap_or(0);
        let month = match month_from_name(&caps[2]) {
            Some(m) => m,
            None => {
                return DateParseResult::unresolved(DatePattern::DayMonthName, "unknown month name")
            }
        };
        let year = match resolve_year(&caps[3]) {
            Ok(y) => y,
            Err(reason) => return DateParseResult::unresolved(DatePattern::DayMonthName, reason),
        };
        return validate(year, month, day, DatePattern::DayMonthName, None);
    }

    if let Some(caps) = MONTH_NAME_DAY.captures(trimmed) {
        let month = match month_from_name(&caps[1]) {
            Some(m) => m,
            None => {
                return DateParseResult::unresolved(DatePattern::MonthNameDay, "unknown month name")
            }
        };
        let day: u32 = caps[2].parse().unwrap_or(0);
        let year: i32 = match caps.get(3) {
            Some(y) => y.as_str().parse().unwrap_or(0),
            // a month and day alone cannot be anchored to a timeline
            None => return DateParseResult::unresolved(DatePattern::MonthNameDay, "missing year"),
        };
        return validate(year, month, day, DatePattern::MonthNameDay, None);
    }

    DateParseResult::unresolved(DatePattern::None, "unrecognized date format")
}

/// Strip surrounding whitespace, punctuation, and template placeholder
/// characters without touching the interior of the date text.
fn strip_surrounds(raw: &str) -> &str {
    raw.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '[' | ']' | '{' | '}' | '(' | ')' | '<' | '>' | '.' | ',' | ';' | ':' | '"' | '\'' | '_' | '*')
    })
}

fn resolve_year(text: &str) -> Result<i32, String> {
    match text.len() {
        2 => {
            let short: u32 = text.parse().map_err(|_| "invalid year".to_string())?;
            if short <= TWO_DIGIT_PIVOT {
                Ok(2000 + short as i32)
            } else {
                Ok(1900 + short as i32)
            }
        }
        4 => text.parse().map_err(|_| "invalid year".to_string()),
        _ => Err(format!("unsupported year '{}'", text)),
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let prefix = lower.get(0..3)?;
    let month = match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Reconstruct a proleptic Gregorian date from the candidate fields and
/// range-check it.
fn validate(
    year: i32,
    month: u32,
    day: u32,
    pattern: DatePattern,
    warning: Option<String>,
) -> DateParseResult {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return DateParseResult::unresolved(
            pattern,
            format!("year {} outside supported range [{}, {}]", year, MIN_YEAR, MAX_YEAR),
        );
    }
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => DateParseResult::resolved(date, pattern, warning),
        None => DateParseResult::unresolved(pattern, "invalid calendar date"),
    }
}
